// Copyright (c) 2025 Jonathan Fontanez
// SPDX-License-Identifier: BUSL-1.1

//! Declarative kernel signatures.
//!
//! A signature lists the kernel's parameters after the leading context
//! parameter, which is always passed separately as a
//! [`KernelContext`](super::KernelContext) and never declared here.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::core::types::ColumnType;

/// How a parameter binds to call arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    /// Bound by name. The only kind a fixed-arity kernel may use.
    Keyword,
    PositionalOnly,
    /// Catch-all positional parameter; marks the kernel variadic.
    VarPositional,
    /// Catch-all keyword parameter.
    VarKeyword,
}

/// Type annotation of a parameter or return value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Annotation {
    Blob,
    Frame,
    Sequence(Box<Annotation>),
    /// Fixed-size tuple; only valid as a return type.
    Tuple(Vec<Annotation>),
    /// Variable-length tuple; always rejected.
    VarTuple(Box<Annotation>),
}

impl Annotation {
    pub fn sequence(inner: Annotation) -> Self {
        Annotation::Sequence(Box::new(inner))
    }

    /// Column type of a leaf annotation.
    pub fn column_type(&self) -> Option<ColumnType> {
        match self {
            Annotation::Blob => Some(ColumnType::Blob),
            Annotation::Frame => Some(ColumnType::Video),
            _ => None,
        }
    }
}

impl fmt::Display for Annotation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Annotation::Blob => write!(f, "Blob"),
            Annotation::Frame => write!(f, "Frame"),
            Annotation::Sequence(inner) => write!(f, "Sequence[{}]", inner),
            Annotation::Tuple(items) => {
                let items: Vec<String> = items.iter().map(|a| a.to_string()).collect();
                write!(f, "Tuple[{}]", items.join(", "))
            }
            Annotation::VarTuple(inner) => write!(f, "Tuple[{}, ...]", inner),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelParam {
    pub name: String,
    pub kind: ParamKind,
    #[serde(default)]
    pub annotation: Option<Annotation>,
}

impl KernelParam {
    pub fn keyword(name: impl Into<String>, annotation: Annotation) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Keyword,
            annotation: Some(annotation),
        }
    }

    pub fn unannotated(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Keyword,
            annotation: None,
        }
    }

    pub fn var_positional(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::VarPositional,
            annotation: None,
        }
    }

    pub fn with_kind(mut self, kind: ParamKind) -> Self {
        self.kind = kind;
        self
    }
}

/// Parameters (context excluded) and return annotation of a kernel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KernelSignature {
    pub params: Vec<KernelParam>,
    pub returns: Option<Annotation>,
}

impl KernelSignature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn param(mut self, param: KernelParam) -> Self {
        self.params.push(param);
        self
    }

    /// Shorthand for a keyword parameter.
    pub fn input(self, name: impl Into<String>, annotation: Annotation) -> Self {
        self.param(KernelParam::keyword(name, annotation))
    }

    /// Shorthand for a single catch-all positional parameter.
    pub fn variadic(self, name: impl Into<String>) -> Self {
        self.param(KernelParam::var_positional(name))
    }

    pub fn returns(mut self, annotation: Annotation) -> Self {
        self.returns = Some(annotation);
        self
    }
}
