use std::{fmt::Display, str::FromStr};

use itertools::Itertools;
use thiserror::Error;

use crate::{Automaton, ConcreteDfa, Entry, StateId, TransitionSpec};

const HEADER: &str = "ConcreteDfa(";

/// The errors that can occur when parsing the textual encoding of a [`ConcreteDfa`].
#[derive(Debug, Clone, Eq, PartialEq, Error)]
#[allow(missing_docs)]
pub enum ParseError {
    #[error("encoding does not start with `{HEADER}`")]
    MissingHeader,
    #[error("expected `{expected}` at position {position}")]
    Expected { expected: char, position: usize },
    #[error("expected a number at position {0}")]
    ExpectedNumber(usize),
    #[error("number at position {0} is out of range")]
    OutOfRange(usize),
    #[error("expected a transition with two or three components at position {0}")]
    MalformedEntry(usize),
    #[error("range {lo}..={hi} is inverted")]
    InvertedRange { lo: u8, hi: u8 },
    #[error("transitions of state {0} overlap")]
    Overlapping(usize),
    #[error("state {state} is referenced but the automaton only has {size} states")]
    UnknownState { state: StateId, size: usize },
    #[error("unexpected trailing input at position {0}")]
    TrailingInput(usize),
}

/// Writes the automaton as `ConcreteDfa([...], {...})`, where the list contains for each state its
/// transitions and the set gives the accepting states. A transition is either `(byte, target)` or
/// `(lo, hi, target)` for a maximal run of consecutive bytes with the same target. If the start
/// state is not `0`, the encoding ends in `, start=q`. The encoding only depends on the transition
/// function, so it is the same no matter how the transitions are stored internally.
impl Display for ConcreteDfa {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let states = (0..self.size() as StateId)
            .map(|q| {
                let entries = self
                    .entries(q)
                    .into_iter()
                    .map(|Entry { lo, hi, target }| {
                        if lo == hi {
                            format!("({lo}, {target})")
                        } else {
                            format!("({lo}, {hi}, {target})")
                        }
                    })
                    .join(", ");
                format!("[{entries}]")
            })
            .join(", ");
        let accepting = self.accepting_states().join(", ");
        write!(f, "{HEADER}[{states}], {{{accepting}}}")?;
        if self.start() != 0 {
            write!(f, ", start={}", self.start())?;
        }
        write!(f, ")")
    }
}

struct Cursor<'a> {
    input: &'a [u8],
    position: usize,
}

impl Cursor<'_> {
    fn skip_whitespace(&mut self) {
        while self
            .input
            .get(self.position)
            .is_some_and(|c| c.is_ascii_whitespace())
        {
            self.position += 1;
        }
    }

    fn peek(&mut self) -> Option<u8> {
        self.skip_whitespace();
        self.input.get(self.position).copied()
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected as u8) {
            self.position += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: char) -> Result<(), ParseError> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(ParseError::Expected {
                expected,
                position: self.position,
            })
        }
    }

    fn number(&mut self) -> Result<u64, ParseError> {
        self.skip_whitespace();
        let begin = self.position;
        while self
            .input
            .get(self.position)
            .is_some_and(|c| c.is_ascii_digit())
        {
            self.position += 1;
        }
        if begin == self.position {
            return Err(ParseError::ExpectedNumber(begin));
        }
        std::str::from_utf8(&self.input[begin..self.position])
            .ok()
            .and_then(|digits| digits.parse().ok())
            .ok_or(ParseError::OutOfRange(begin))
    }

    fn state(&mut self) -> Result<StateId, ParseError> {
        let position = self.position;
        let value = self.number()?;
        // the largest value is reserved for the dead state
        StateId::try_from(value)
            .ok()
            .filter(|q| *q != crate::DEAD)
            .ok_or(ParseError::OutOfRange(position))
    }

    /// Parses a comma separated list of items enclosed by `open` and `close`.
    fn list<T>(
        &mut self,
        open: char,
        close: char,
        mut item: impl FnMut(&mut Self) -> Result<T, ParseError>,
    ) -> Result<Vec<T>, ParseError> {
        self.expect(open)?;
        let mut out = vec![];
        if self.eat(close) {
            return Ok(out);
        }
        loop {
            out.push(item(self)?);
            if self.eat(close) {
                return Ok(out);
            }
            self.expect(',')?;
        }
    }

    fn entry(&mut self) -> Result<Entry, ParseError> {
        let position = self.position;
        let numbers = self.list('(', ')', |c| c.state())?;
        let to_byte = |n: StateId| u8::try_from(n).map_err(|_| ParseError::OutOfRange(position));
        match numbers[..] {
            [byte, target] => Ok(Entry::single(to_byte(byte)?, target)),
            [lo, hi, target] => {
                let (lo, hi) = (to_byte(lo)?, to_byte(hi)?);
                if lo > hi {
                    return Err(ParseError::InvertedRange { lo, hi });
                }
                Ok(Entry::range(lo, hi, target))
            }
            _ => Err(ParseError::MalformedEntry(position)),
        }
    }
}

impl FromStr for ConcreteDfa {
    type Err = ParseError;

    /// Parses the encoding produced by the [`Display`] implementation. Instead of panicking on
    /// malformed automata like [`ConcreteDfa::new`], this reports an error.
    ///
    /// # Example
    /// ```
    /// use byte_dfa::prelude::*;
    ///
    /// let encoded = "ConcreteDfa([[(0, 1), (1, 2)], [], [(1, 3)], []], {1, 3})";
    /// let dfa: ConcreteDfa = encoded.parse().unwrap();
    /// assert!(dfa.matches(&[1, 1]));
    /// assert_eq!(dfa.to_string().parse::<ConcreteDfa>().unwrap(), dfa);
    /// ```
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_start();
        let Some(rest) = trimmed.strip_prefix(HEADER) else {
            return Err(ParseError::MissingHeader);
        };
        let mut cursor = Cursor {
            input: rest.as_bytes(),
            position: 0,
        };

        let states = cursor.list('[', ']', |c| c.list('[', ']', Cursor::entry))?;
        cursor.expect(',')?;
        let accepting = cursor.list('{', '}', Cursor::state)?;
        let mut start = 0;
        if cursor.eat(',') {
            for keyword in "start".chars() {
                cursor.expect(keyword)?;
            }
            cursor.expect('=')?;
            start = cursor.state()?;
        }
        cursor.expect(')')?;
        if cursor.peek().is_some() {
            return Err(ParseError::TrailingInput(cursor.position));
        }

        let size = states.len();
        let check = |state: StateId| {
            if (state as usize) < size {
                Ok(())
            } else {
                Err(ParseError::UnknownState { state, size })
            }
        };
        check(start)?;
        for q in &accepting {
            check(*q)?;
        }
        for (q, entries) in states.iter().enumerate() {
            let mut sorted = entries.clone();
            sorted.sort();
            if sorted.iter().tuple_windows().any(|(l, r)| l.hi >= r.lo) {
                return Err(ParseError::Overlapping(q));
            }
            for entry in entries {
                check(entry.target)?;
            }
        }

        Ok(ConcreteDfa::new(
            states.into_iter().map(TransitionSpec::Entries),
            accepting,
            start,
        ))
    }
}

#[cfg(test)]
mod tests {
    use crate::prelude::*;

    #[test]
    fn encoding_compresses_runs() {
        let dfa = ConcreteDfa::new(
            [
                TransitionSpec::map((0..=9).map(|b| (b, 1))),
                TransitionSpec::pairs([(3, 1), (4, 0)]),
            ],
            [1],
            1,
        );
        assert_eq!(
            dfa.to_string(),
            "ConcreteDfa([[(0, 9, 1)], [(3, 1), (4, 0)]], {1}, start=1)"
        );
    }

    #[test]
    fn encoding_does_not_depend_on_representation() {
        let sparse = ConcreteDfa::from_pairs(
            vec![vec![(0, 0), (1, 1), (2, 2), (3, 1), (4, 0)], vec![(0, 0)], vec![]],
            [2],
            0,
        );
        let before = sparse.to_string();
        sparse.transition(0, 0);
        assert!(sparse.is_dense(0));
        assert_eq!(sparse.to_string(), before);

        let dense = ConcreteDfa::new(
            [
                TransitionSpec::map([(0, 0), (1, 1), (2, 2), (3, 1), (4, 0)]),
                TransitionSpec::map([(0, 0)]),
                TransitionSpec::none(),
            ],
            [2],
            0,
        );
        assert_eq!(dense.to_string(), before);
    }

    #[test]
    fn parses_its_own_encoding() {
        let encoded = "ConcreteDfa([[(0, 4, 1), (7, 2)], [(255, 0)], []], {0, 2}, start=1)";
        let dfa: ConcreteDfa = encoded.parse().unwrap();
        assert_eq!(dfa.start(), 1);
        assert_eq!(dfa.transition(0, 3), 1);
        assert_eq!(dfa.transition(0, 7), 2);
        assert_eq!(dfa.transition(1, 255), 0);
        assert_eq!(dfa.to_string(), encoded);
    }

    #[test]
    fn tolerates_whitespace() {
        let dfa: ConcreteDfa = " ConcreteDfa( [ [ (1 ,0) ] ] , { } )".parse().unwrap();
        assert_eq!(dfa.to_string(), "ConcreteDfa([[(1, 0)]], {})");
    }

    #[test]
    fn rejects_malformed_encodings() {
        let parse = |s: &str| s.parse::<ConcreteDfa>().unwrap_err();
        assert_eq!(parse("DFA([[]], {})"), ParseError::MissingHeader);
        assert_eq!(
            parse("ConcreteDfa([[(0, 1)]], {})"),
            ParseError::UnknownState { state: 1, size: 1 }
        );
        assert_eq!(parse("ConcreteDfa([[(256, 0)]], {})"), ParseError::OutOfRange(2));
        assert_eq!(
            parse("ConcreteDfa([[(5, 2, 0)]], {})"),
            ParseError::InvertedRange { lo: 5, hi: 2 }
        );
        assert_eq!(
            parse("ConcreteDfa([[(0, 3, 0), (2, 0)]], {})"),
            ParseError::Overlapping(0)
        );
        assert_eq!(parse("ConcreteDfa([[(0)]], {})"), ParseError::MalformedEntry(2));
        assert_eq!(parse("ConcreteDfa([[]], {}) x"), ParseError::TrailingInput(10));
        assert!(matches!(
            parse("ConcreteDfa([[]], {0}"),
            ParseError::Expected { expected: ')', .. }
        ));
    }
}
