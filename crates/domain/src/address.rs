//! Control address — the only addressing primitive in the hub.
//!
//! A [`ControlAddress`] is a triple of opaque identifiers
//! `{controller, node, value}`. Its canonical key joins the three parts with
//! `/`, escaping `\` and `/` inside each part, so distinct triples never
//! share a key and the key parses back into the same triple.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

const SEPARATOR: char = '/';
const ESCAPE: char = '\\';

/// Errors raised while parsing a canonical address key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("expected 3 parts separated by `/`, found {0}")]
    PartCount(usize),
    #[error("dangling escape at end of key")]
    DanglingEscape,
    #[error("unknown escape sequence `\\{0}`")]
    UnknownEscape(char),
}

/// `{controller, node, value}` triple addressing one controllable point.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ControlAddress {
    #[serde(rename = "controller")]
    pub controller_id: String,
    #[serde(rename = "node")]
    pub node_id: String,
    #[serde(rename = "value")]
    pub value_id: String,
}

impl ControlAddress {
    #[must_use]
    pub fn new(
        controller_id: impl Into<String>,
        node_id: impl Into<String>,
        value_id: impl Into<String>,
    ) -> Self {
        Self {
            controller_id: controller_id.into(),
            node_id: node_id.into(),
            value_id: value_id.into(),
        }
    }

    /// Same controller and node, different value.
    #[must_use]
    pub fn with_value(&self, value_id: impl Into<String>) -> Self {
        Self {
            controller_id: self.controller_id.clone(),
            node_id: self.node_id.clone(),
            value_id: value_id.into(),
        }
    }

    /// Canonical string form, suitable as a map key.
    #[must_use]
    pub fn key(&self) -> String {
        let mut out = String::with_capacity(
            self.controller_id.len() + self.node_id.len() + self.value_id.len() + 2,
        );
        push_escaped(&mut out, &self.controller_id);
        out.push(SEPARATOR);
        push_escaped(&mut out, &self.node_id);
        out.push(SEPARATOR);
        push_escaped(&mut out, &self.value_id);
        out
    }
}

fn push_escaped(out: &mut String, part: &str) {
    for c in part.chars() {
        if c == SEPARATOR || c == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(c);
    }
}

impl fmt::Display for ControlAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key())
    }
}

impl FromStr for ControlAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts: Vec<String> = vec![String::new()];
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            match c {
                ESCAPE => match chars.next() {
                    Some(next @ (SEPARATOR | ESCAPE)) => {
                        if let Some(last) = parts.last_mut() {
                            last.push(next);
                        }
                    }
                    Some(other) => return Err(AddressError::UnknownEscape(other)),
                    None => return Err(AddressError::DanglingEscape),
                },
                SEPARATOR => parts.push(String::new()),
                other => {
                    if let Some(last) = parts.last_mut() {
                        last.push(other);
                    }
                }
            }
        }

        let count = parts.len();
        let mut iter = parts.into_iter();
        match (iter.next(), iter.next(), iter.next(), iter.next()) {
            (Some(controller_id), Some(node_id), Some(value_id), None) => Ok(Self {
                controller_id,
                node_id,
                value_id,
            }),
            _ => Err(AddressError::PartCount(count)),
        }
    }
}
