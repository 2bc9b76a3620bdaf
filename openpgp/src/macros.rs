use std::cmp;

// Converts an indentation level to whitespace.
pub(crate) fn indent(i: isize) -> &'static str {
    use std::convert::TryFrom;
    let s = "                                                  ";
    &s[0..cmp::min(usize::try_from(i).unwrap_or(0), s.len())]
}

/// Defines a local `t!` macro that logs at trace level.
///
/// Whether anything is emitted is decided by the installed logger,
/// filtered on the calling module's path (for instance
/// `RUST_LOG=openpgp_keyring::parse=trace` with `env_logger`).
macro_rules! tracer {
    ( $func:expr ) => {
        tracer!($func, 0)
    };
    ( $func:expr, $indent:expr ) => {
        // Rust doesn't support $( ... ) in a nested macro's
        // definition, hence the fixed arities.
        #[allow(unused_macros)]
        macro_rules! t {
            ( $fmt:expr ) =>
            { log::trace!("{}{}: {}", crate::macros::indent($indent), $func, $fmt) };
            ( $fmt:expr, $a:expr ) =>
            { log::trace!("{}{}: {}", crate::macros::indent($indent), $func, format!($fmt, $a)) };
            ( $fmt:expr, $a:expr, $b:expr ) =>
            { log::trace!("{}{}: {}", crate::macros::indent($indent), $func, format!($fmt, $a, $b)) };
            ( $fmt:expr, $a:expr, $b:expr, $c:expr ) =>
            { log::trace!("{}{}: {}", crate::macros::indent($indent), $func, format!($fmt, $a, $b, $c)) };
            ( $fmt:expr, $a:expr, $b:expr, $c:expr, $d:expr ) =>
            { log::trace!("{}{}: {}", crate::macros::indent($indent), $func, format!($fmt, $a, $b, $c, $d)) };
            ( $fmt:expr, $a:expr, $b:expr, $c:expr, $d:expr, $e:expr ) =>
            { log::trace!("{}{}: {}", crate::macros::indent($indent), $func, format!($fmt, $a, $b, $c, $d, $e)) };
        }
    }
}

/// Like `try!`, but turns a short read into a `TruncatedPacket`
/// error naming the field that was being read.
macro_rules! read_or_truncated {
    ( $expr:expr, $what:expr ) => {
        match $expr {
            Ok(v) => v,
            Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                return Err(crate::Error::TruncatedPacket(
                    format!("{}: {}", $what, e)).into()),
            Err(e) => return Err(e.into()),
        }
    };
}

#[cfg(test)]
mod tests {
    #[test]
    fn indent() {
        assert_eq!(super::indent(-1), "");
        assert_eq!(super::indent(0), "");
        assert_eq!(super::indent(3), "   ");
        assert_eq!(super::indent(500).len(), 50);
    }
}
