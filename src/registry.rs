//! Enumeration registry: closed value sets and free-text coercion.
//!
//! Model output is noisy. A status may come back as `"approved"`, `"Approved"`
//! or `"APPROVED"`, a month as `"Sep"`, `"9"` or `"September"`. Every
//! enumerated field passes through [`canonicalize`], which maps the raw text
//! onto a canonical upper-case member.
//!
//! ## Fallback policy
//!
//! Each enumeration declares its fallback explicitly at definition time:
//!
//! | Enumeration | Unmatched non-empty input |
//! |-------------|---------------------------|
//! | [`ProjectStatus`] | `PENDING` |
//! | [`Severity`] | `HIGH` |
//! | [`Likelihood`] | `HIGH` |
//! | [`IssueStatus`] | `OPEN` |
//! | [`Month`] | `None` (aliases are tried first) |
//!
//! Empty or missing input always yields `None`; the caller decides whether an
//! absent value is acceptable.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A closed set of canonical upper-case tokens.
pub trait Enumeration: Copy + Eq + Sized + 'static {
    /// Human-readable name used in log lines.
    const NAME: &'static str;

    /// Members in declaration order.
    const MEMBERS: &'static [Self];

    /// Value returned for a non-empty string that matches no member or alias.
    const FALLBACK: Option<Self>;

    /// Lower-case aliases accepted in addition to the canonical tokens.
    const ALIASES: &'static [(&'static str, Self)] = &[];

    /// Canonical token for this member.
    fn as_str(self) -> &'static str;
}

/// Coerce free text onto a member of `E`.
///
/// Matching is case-insensitive and ignores surrounding whitespace. Missing
/// or blank input yields `None`; anything else yields the matching member,
/// an alias match, or `E::FALLBACK`.
pub fn canonicalize<E: Enumeration>(raw: Option<&str>) -> Option<E> {
    let trimmed = raw.map(str::trim).filter(|s| !s.is_empty())?;

    if let Some(member) = E::MEMBERS
        .iter()
        .copied()
        .find(|m| m.as_str().eq_ignore_ascii_case(trimmed))
    {
        return Some(member);
    }

    let folded = integral_numeral(trimmed).unwrap_or_else(|| trimmed.to_lowercase());
    if let Some((_, member)) = E::ALIASES.iter().find(|(alias, _)| *alias == folded) {
        return Some(*member);
    }

    if let Some(fallback) = E::FALLBACK {
        tracing::debug!(
            "{}: '{}' is not a known value, using {}",
            E::NAME,
            trimmed,
            fallback.as_str()
        );
    }
    E::FALLBACK
}

/// `"01"`, `"1.0"` and `"1"` all read as `"1"`.
fn integral_numeral(s: &str) -> Option<String> {
    if !s.starts_with(|c: char| c.is_ascii_digit()) {
        return None;
    }
    let n: f64 = s.parse().ok()?;
    (n.is_finite() && n.fract() == 0.0 && n <= u32::MAX as f64).then(|| format!("{}", n as u64))
}

macro_rules! enumeration {
    (
        $(#[$meta:meta])*
        $name:ident, $label:literal, fallback = $fallback:expr $(, aliases = $aliases:expr)?,
        { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(
                #[serde(rename = $text)]
                $variant,
            )+
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(Enumeration::as_str(*self))
            }
        }

        impl Enumeration for $name {
            const NAME: &'static str = $label;
            const MEMBERS: &'static [Self] = &[$($name::$variant),+];
            const FALLBACK: Option<Self> = $fallback;
            $(const ALIASES: &'static [(&'static str, Self)] = $aliases;)?

            fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text,)+
                }
            }
        }
    };
}

enumeration!(
    /// Approval state shared by projects and reports.
    ProjectStatus, "ProjectStatus", fallback = Some(ProjectStatus::Pending),
    { Pending => "PENDING", Denied => "DENIED", Approved => "APPROVED" }
);

enumeration!(
    /// Impact of an issue if it materialises.
    Severity, "Severity", fallback = Some(Severity::High),
    { High => "HIGH", Medium => "MEDIUM", Low => "LOW" }
);

enumeration!(
    /// Probability that an issue materialises.
    Likelihood, "Likelihood", fallback = Some(Likelihood::High),
    { High => "HIGH", Medium => "MEDIUM", Low => "LOW" }
);

enumeration!(
    /// Whether an issue is still being tracked.
    IssueStatus, "Status", fallback = Some(IssueStatus::Open),
    { Open => "OPEN", Closed => "CLOSED" }
);

enumeration!(
    /// Calendar month of a report.
    ///
    /// No fallback: an unreadable month is left empty.
    Month, "Month", fallback = None, aliases = MONTH_ALIASES,
    {
        January => "JANUARY",
        February => "FEBRUARY",
        March => "MARCH",
        April => "APRIL",
        May => "MAY",
        June => "JUNE",
        July => "JULY",
        August => "AUGUST",
        September => "SEPTEMBER",
        October => "OCTOBER",
        November => "NOVEMBER",
        December => "DECEMBER",
    }
);

/// Three-letter abbreviations and 1–12 numerals. Full names match the
/// canonical tokens directly.
const MONTH_ALIASES: &[(&str, Month)] = &[
    ("jan", Month::January),
    ("1", Month::January),
    ("feb", Month::February),
    ("2", Month::February),
    ("mar", Month::March),
    ("3", Month::March),
    ("apr", Month::April),
    ("4", Month::April),
    ("5", Month::May),
    ("jun", Month::June),
    ("6", Month::June),
    ("jul", Month::July),
    ("7", Month::July),
    ("aug", Month::August),
    ("8", Month::August),
    ("sep", Month::September),
    ("9", Month::September),
    ("oct", Month::October),
    ("10", Month::October),
    ("nov", Month::November),
    ("11", Month::November),
    ("dec", Month::December),
    ("12", Month::December),
];
