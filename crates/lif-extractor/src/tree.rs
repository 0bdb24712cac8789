//! Constituency parse trees and their bracketed (Penn) text form
//!
//! Reading, rendering and traversal use explicit stacks so deep trees do not
//! grow the call stack.

use std::str::FromStr;

use lif_core::{LifError, Result};

/// A node of a constituency parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseTree {
    /// Token node; carries the covered text
    Terminal(String),
    /// Syntactic category with ordered children
    Phrase {
        label: String,
        children: Vec<ParseTree>,
    },
}

impl ParseTree {
    pub fn terminal(text: impl Into<String>) -> Self {
        Self::Terminal(text.into())
    }

    pub fn phrase(label: impl Into<String>, children: Vec<ParseTree>) -> Self {
        Self::Phrase {
            label: label.into(),
            children,
        }
    }

    /// A part-of-speech node over a single token, e.g. `(NN cat)`
    pub fn preterminal(tag: impl Into<String>, word: impl Into<String>) -> Self {
        Self::phrase(tag, vec![Self::terminal(word)])
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Terminal(_))
    }

    /// Covered text for terminals, syntactic category otherwise
    pub fn label(&self) -> &str {
        match self {
            Self::Terminal(text) => text,
            Self::Phrase { label, .. } => label,
        }
    }

    pub fn children(&self) -> &[ParseTree] {
        match self {
            Self::Terminal(_) => &[],
            Self::Phrase { children, .. } => children,
        }
    }

    /// Total number of nodes, terminals included
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.children());
        }
        count
    }

    /// Terminal texts, left to right
    pub fn terminals(&self) -> Vec<&str> {
        let mut words = Vec::new();
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            match node {
                Self::Terminal(text) => words.push(text.as_str()),
                Self::Phrase { children, .. } => stack.extend(children.iter().rev()),
            }
        }
        words
    }

    /// Render as a single-line bracketed tree: `(S (NP (DT The) (NN cat)) ...)`
    pub fn to_penn(&self) -> String {
        enum Step<'a> {
            Node(&'a ParseTree),
            Emit(&'static str),
        }

        let mut out = String::new();
        let mut stack = vec![Step::Node(self)];
        while let Some(step) = stack.pop() {
            match step {
                Step::Emit(s) => out.push_str(s),
                Step::Node(Self::Terminal(text)) => out.push_str(text),
                Step::Node(Self::Phrase { label, children }) => {
                    out.push('(');
                    out.push_str(label);
                    stack.push(Step::Emit(")"));
                    for child in children.iter().rev() {
                        stack.push(Step::Node(child));
                        stack.push(Step::Emit(" "));
                    }
                }
            }
        }
        out
    }

    /// Read a bracketed tree
    ///
    /// An unlabeled wrapper around a single phrase, as in treebank files
    /// (`( (S ...) )`), is removed.
    pub fn from_penn(input: &str) -> Result<Self> {
        struct Open {
            label: String,
            children: Vec<ParseTree>,
        }

        let mut tokens = tokenize(input).into_iter().peekable();
        let mut stack: Vec<Open> = Vec::new();
        let mut root: Option<ParseTree> = None;

        while let Some(token) = tokens.next() {
            if root.is_some() {
                return Err(malformed("trailing input after tree"));
            }
            match token {
                Token::Open => {
                    let label = match tokens.peek() {
                        Some(Token::Atom(label)) => {
                            let label = label.to_string();
                            tokens.next();
                            label
                        }
                        _ => String::new(),
                    };
                    stack.push(Open {
                        label,
                        children: Vec::new(),
                    });
                }
                Token::Atom(text) => match stack.last_mut() {
                    Some(open) => open.children.push(Self::terminal(text)),
                    None => return Err(malformed(format!("token {text:?} outside brackets"))),
                },
                Token::Close => {
                    let open = stack.pop().ok_or_else(|| malformed("unbalanced ')'"))?;
                    let node = Self::Phrase {
                        label: open.label,
                        children: open.children,
                    };
                    match stack.last_mut() {
                        Some(parent) => parent.children.push(node),
                        None => root = Some(node),
                    }
                }
            }
        }

        if !stack.is_empty() {
            return Err(malformed("unbalanced '('"));
        }
        let root = root.ok_or_else(|| malformed("empty input"))?;
        Ok(strip_unlabeled_root(root))
    }
}

impl std::fmt::Display for ParseTree {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_penn())
    }
}

impl FromStr for ParseTree {
    type Err = LifError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_penn(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    Open,
    Close,
    Atom(&'a str),
}

fn tokenize(input: &str) -> Vec<Token<'_>> {
    let mut tokens = Vec::new();
    let mut atom_start: Option<usize> = None;

    for (i, c) in input.char_indices() {
        if c == '(' || c == ')' || c.is_whitespace() {
            if let Some(start) = atom_start.take() {
                tokens.push(Token::Atom(&input[start..i]));
            }
            match c {
                '(' => tokens.push(Token::Open),
                ')' => tokens.push(Token::Close),
                _ => {}
            }
        } else if atom_start.is_none() {
            atom_start = Some(i);
        }
    }
    if let Some(start) = atom_start {
        tokens.push(Token::Atom(&input[start..]));
    }
    tokens
}

fn strip_unlabeled_root(tree: ParseTree) -> ParseTree {
    match tree {
        ParseTree::Phrase {
            label,
            mut children,
        } if label.is_empty() && children.len() == 1 && !children[0].is_terminal() => {
            match children.pop() {
                Some(only) => only,
                None => ParseTree::Phrase { label, children },
            }
        }
        other => other,
    }
}

fn malformed(msg: impl Into<String>) -> LifError {
    LifError::MalformedTree(msg.into())
}
