//! Version token parsing and comparison.
//!
//! JVM-ecosystem versions are dot/dash-separated tokens with a custom total
//! order rather than semver: numeric segments compare as numbers, a small
//! set of named qualifiers carries its own ranking (`alpha` through `sp`,
//! with the bare release between `snapshot` and `sp`), unrecognized words
//! sort just below a release, and absent trailing segments act as release
//! boundaries, so `1.0` equals `1.0.0` and beats `1.0-rc`.

use std::cmp::Ordering;
use std::fmt;

/// A parsed version with a structural total order.
///
/// The original text is kept for display and persistence; comparison works
/// on the parsed pieces, so `1.0` and `1.0.0` are equal yet display as
/// written.
#[derive(Debug, Clone)]
pub struct VersionToken {
    original: String,
    pieces: Vec<Piece>,
}

/// One `.`/`-`-separated segment of a version.
#[derive(Debug, Clone)]
enum Piece {
    Number(u64),
    Mark(Mark),
    /// Unrecognized text, lowercased at parse time.
    Word(String),
}

/// Ranked release qualifiers. Declaration order is comparison order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Mark {
    Alpha,
    Beta,
    Milestone,
    Candidate,
    Snapshot,
    Release,
    ServicePack,
}

impl Mark {
    const TABLE: &'static [(&'static str, Mark)] = &[
        ("alpha", Self::Alpha),
        ("a", Self::Alpha),
        ("beta", Self::Beta),
        ("b", Self::Beta),
        ("milestone", Self::Milestone),
        ("m", Self::Milestone),
        ("rc", Self::Candidate),
        ("cr", Self::Candidate),
        ("snapshot", Self::Snapshot),
        ("ga", Self::Release),
        ("final", Self::Release),
        ("release", Self::Release),
        ("sp", Self::ServicePack),
    ];

    fn from_token(lowered: &str) -> Option<Self> {
        Self::TABLE
            .iter()
            .find(|(name, _)| *name == lowered)
            .map(|(_, mark)| *mark)
    }

    /// Where unrecognized words slot in: below a release, above every
    /// pre-release qualifier.
    fn against_word(self) -> Ordering {
        if self >= Self::Release {
            Ordering::Greater
        } else {
            Ordering::Less
        }
    }
}

impl Piece {
    fn from_token(token: &str) -> Self {
        if let Ok(number) = token.parse() {
            return Self::Number(number);
        }
        let lowered = token.to_lowercase();
        match Mark::from_token(&lowered) {
            Some(mark) => Self::Mark(mark),
            None => Self::Word(lowered),
        }
    }

    /// How this piece compares against the implicit boundary past the end
    /// of a shorter version. Zero and release are neutral there.
    fn against_boundary(&self) -> Ordering {
        match self {
            Self::Number(0) => Ordering::Equal,
            Self::Number(_) => Ordering::Greater,
            Self::Mark(mark) => mark.cmp(&Mark::Release),
            Self::Word(_) => Ordering::Less,
        }
    }
}

/// Pairwise order of two optional pieces; `None` stands for the boundary
/// past the end of the shorter version. Numbers outrank everything else.
fn order_pieces(a: Option<&Piece>, b: Option<&Piece>) -> Ordering {
    use Piece::{Mark as M, Number, Word};
    match (a, b) {
        (None, None) => Ordering::Equal,
        (Some(piece), None) => piece.against_boundary(),
        (None, Some(piece)) => piece.against_boundary().reverse(),
        (Some(Number(x)), Some(Number(y))) => x.cmp(y),
        (Some(Number(_)), Some(_)) => Ordering::Greater,
        (Some(_), Some(Number(_))) => Ordering::Less,
        (Some(M(x)), Some(M(y))) => x.cmp(y),
        (Some(M(mark)), Some(Word(_))) => mark.against_word(),
        (Some(Word(_)), Some(M(mark))) => mark.against_word().reverse(),
        (Some(Word(x)), Some(Word(y))) => x.cmp(y),
    }
}

impl VersionToken {
    pub fn parse(version: &str) -> Self {
        let pieces = version
            .split(['.', '-'])
            .filter(|part| !part.is_empty())
            .map(Piece::from_token)
            .collect();
        Self {
            original: version.to_owned(),
            pieces,
        }
    }

    /// The version exactly as written.
    pub fn as_str(&self) -> &str {
        &self.original
    }

    pub fn is_snapshot(&self) -> bool {
        self.original.ends_with("-SNAPSHOT")
    }
}

impl fmt::Display for VersionToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

impl Ord for VersionToken {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.pieces.len().max(other.pieces.len());
        (0..len)
            .map(|i| order_pieces(self.pieces.get(i), other.pieces.get(i)))
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for VersionToken {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for VersionToken {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for VersionToken {}
