//! Static validation of Brainfuck source.
//!
//! The validator is a single left-to-right pass that checks loop brackets are
//! balanced and records, for every bracket, the position of its partner. It
//! never executes anything, so an invalid program is rejected before any
//! output can be produced.

/// A structural problem found before execution.
///
/// Positions are zero-based character indices into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// A `[` that is never closed. Reports the earliest such bracket.
    #[error("unmatched '[' at position {position}")]
    UnmatchedOpenBracket { position: usize },

    /// A `]` with no open loop to close.
    #[error("unmatched ']' at position {position}")]
    UnmatchedCloseBracket { position: usize },
}

impl ValidationError {
    /// Character index the error points at.
    pub fn position(&self) -> usize {
        match self {
            ValidationError::UnmatchedOpenBracket { position }
            | ValidationError::UnmatchedCloseBracket { position } => *position,
        }
    }
}

/// Bidirectional mapping between matching `[` and `]` positions.
///
/// The table is dense: it has one slot per source character. Bracket slots
/// hold the partner's position; every other slot holds its own index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JumpTable {
    partners: Vec<usize>,
}

impl JumpTable {
    /// Number of source characters the table was built from.
    pub fn len(&self) -> usize {
        self.partners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.partners.is_empty()
    }

    /// Partner of the bracket at `position`, or `None` if there is no bracket there.
    pub fn partner(&self, position: usize) -> Option<usize> {
        match self.partners.get(position) {
            Some(&p) if p != position => Some(p),
            _ => None,
        }
    }

    /// Partner lookup for the interpreter loop. `position` must be in range.
    #[inline]
    pub(crate) fn target(&self, position: usize) -> usize {
        self.partners[position]
    }

    /// Whether this table is the jump table of `code`. Linear time.
    pub(crate) fn describes(&self, code: &[char]) -> bool {
        if code.len() != self.partners.len() {
            return false;
        }
        let mut stack: Vec<usize> = Vec::new();
        for (i, &c) in code.iter().enumerate() {
            let partner = self.partners[i];
            match c {
                '[' => stack.push(i),
                ']' => match stack.pop() {
                    Some(open) if partner == open && self.partners[open] == i => {}
                    _ => return false,
                },
                _ if partner != i => return false,
                _ => {}
            }
        }
        stack.is_empty()
    }

    /// Iterate over `(open, close)` pairs in order of their opening bracket.
    pub fn pairs(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.partners
            .iter()
            .enumerate()
            .filter(|&(i, &p)| p > i)
            .map(|(i, &p)| (i, p))
    }
}

/// Check bracket balance in `source` and build its jump table.
///
/// Characters outside the eight operators are comments and are skipped.
pub fn validate(source: &str) -> Result<JumpTable, ValidationError> {
    let mut partners: Vec<usize> = Vec::with_capacity(source.len());
    let mut stack: Vec<usize> = Vec::new();

    for (i, c) in source.chars().enumerate() {
        partners.push(i);
        match c {
            '[' => stack.push(i),
            ']' => {
                let Some(open) = stack.pop() else {
                    return Err(ValidationError::UnmatchedCloseBracket { position: i });
                };
                partners[open] = i;
                partners[i] = open;
            }
            _ => {}
        }
    }

    // The bottom of the stack is the earliest bracket left open.
    if let Some(&position) = stack.first() {
        return Err(ValidationError::UnmatchedOpenBracket { position });
    }

    Ok(JumpTable { partners })
}

/// A validated program: its characters plus the jump table derived from them.
///
/// Built once and read-only afterwards.
#[derive(Debug, Clone)]
pub struct Program {
    code: Vec<char>,
    jumps: JumpTable,
}

impl Program {
    /// Validate `source` and bundle it with its jump table.
    pub fn parse(source: &str) -> Result<Self, ValidationError> {
        let jumps = validate(source)?;
        Ok(Self {
            code: source.chars().collect(),
            jumps,
        })
    }

    /// Pair `source` with a jump table produced earlier by [`validate`].
    ///
    /// Returns `None` unless `jumps` is exactly the table of `source`: every
    /// `[` paired with a later `]`, every `]` with an earlier `[`, pairs
    /// symmetric and properly nested, all other slots pointing at themselves.
    pub fn from_parts(source: &str, jumps: JumpTable) -> Option<Self> {
        let code: Vec<char> = source.chars().collect();
        if !jumps.describes(&code) {
            return None;
        }
        Some(Self { code, jumps })
    }

    pub fn code(&self) -> &[char] {
        &self.code
    }

    pub fn jumps(&self) -> &JumpTable {
        &self.jumps
    }

    pub fn len(&self) -> usize {
        self.code.len()
    }

    pub fn is_empty(&self) -> bool {
        self.code.is_empty()
    }
}
