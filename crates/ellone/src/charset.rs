//! Character sets and named character classes.

use std::fmt;

/// The largest character value accepted in character sets.
pub const MAX_CHAR: u32 = 0xFFFF;

/// An inclusive range of character values.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Range {
    pub from: u32,
    pub to: u32,
}

/// A set of characters stored as sorted, disjoint, non-adjacent ranges.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CharSet {
    ranges: Vec<Range>,
}

impl CharSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ranges(&self) -> &[Range] {
        &self.ranges
    }

    pub fn get(&self, ch: u32) -> bool {
        self.ranges.iter().any(|r| r.from <= ch && ch <= r.to)
    }

    pub fn set(&mut self, ch: u32) {
        self.add_range(ch, ch);
    }

    pub fn add_range(&mut self, from: u32, to: u32) {
        debug_assert!(from <= to);
        let mut from = from;
        let mut to = to;
        let mut merged = Vec::with_capacity(self.ranges.len() + 1);
        let mut inserted = false;
        for &r in &self.ranges {
            if r.to.saturating_add(1) < from {
                merged.push(r);
            } else if to.saturating_add(1) < r.from {
                if !inserted {
                    merged.push(Range { from, to });
                    inserted = true;
                }
                merged.push(r);
            } else {
                from = from.min(r.from);
                to = to.max(r.to);
            }
        }
        if !inserted {
            merged.push(Range { from, to });
        }
        self.ranges = merged;
    }

    pub fn equals(&self, other: &Self) -> bool {
        self.ranges == other.ranges
    }

    /// Number of characters in this set.
    pub fn elements(&self) -> usize {
        self.ranges
            .iter()
            .map(|r| (r.to - r.from) as usize + 1)
            .sum()
    }

    /// The smallest character in this set.
    pub fn first(&self) -> Option<u32> {
        self.ranges.first().map(|r| r.from)
    }

    pub fn or(&mut self, other: &Self) {
        for r in &other.ranges {
            self.add_range(r.from, r.to);
        }
    }

    pub fn and(&mut self, other: &Self) {
        let mut res = CharSet::new();
        for a in &self.ranges {
            for b in &other.ranges {
                let from = a.from.max(b.from);
                let to = a.to.min(b.to);
                if from <= to {
                    res.add_range(from, to);
                }
            }
        }
        *self = res;
    }

    pub fn subtract(&mut self, other: &Self) {
        let mut res = Vec::new();
        for &a in &self.ranges {
            let mut pieces = vec![a];
            for b in &other.ranges {
                pieces = pieces
                    .into_iter()
                    .flat_map(|p| {
                        let mut out = Vec::with_capacity(2);
                        if b.to < p.from || p.to < b.from {
                            out.push(p);
                        } else {
                            if p.from < b.from {
                                out.push(Range {
                                    from: p.from,
                                    to: b.from - 1,
                                });
                            }
                            if b.to < p.to {
                                out.push(Range {
                                    from: b.to + 1,
                                    to: p.to,
                                });
                            }
                        }
                        out
                    })
                    .collect();
            }
            res.extend(pieces);
        }
        self.ranges = res;
    }

    /// Whether every character of `other` is in this set.
    pub fn includes(&self, other: &Self) -> bool {
        other
            .ranges
            .iter()
            .all(|b| self.ranges.iter().any(|a| a.from <= b.from && b.to <= a.to))
    }

    pub fn intersects(&self, other: &Self) -> bool {
        self.ranges.iter().any(|a| {
            other
                .ranges
                .iter()
                .any(|b| a.from <= b.to && b.from <= a.to)
        })
    }

    /// Make this set contain every character.
    pub fn fill(&mut self) {
        self.ranges = vec![Range {
            from: 0,
            to: MAX_CHAR,
        }];
    }
}

impl FromIterator<u32> for CharSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        let mut set = CharSet::new();
        for ch in iter {
            set.set(ch);
        }
        set
    }
}

impl fmt::Display for CharSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for r in &self.ranges {
            if r.from < r.to {
                write!(f, "{} .. {} ", DisplayChar(r.from), DisplayChar(r.to))?;
            } else {
                write!(f, "{} ", DisplayChar(r.from))?;
            }
        }
        Ok(())
    }
}

/// A printable character shown quoted, anything else shown as its code.
pub struct DisplayChar(pub u32);

impl fmt::Display for DisplayChar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match char::from_u32(self.0) {
            Some(ch) if (' '..'\x7f').contains(&ch) && ch != '\'' && ch != '\\' => {
                write!(f, "'{}'", ch)
            }
            _ => write!(f, "{}", self.0),
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct CharClassID(u32);

impl CharClassID {
    #[inline]
    pub(crate) const fn new(raw: u32) -> Self {
        Self(raw)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named set of characters referenced by `class` nodes.
#[derive(Debug)]
pub struct CharClass {
    pub n: CharClassID,
    pub name: String,
    pub set: CharSet,
}
