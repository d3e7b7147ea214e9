use std::fmt::Write;
use strata_core::SqlWriter;

/// Postgres dialect: `$n` placeholders and `'\x..'` bytea literals.
#[derive(Debug, Default, Clone, Copy)]
pub struct PostgresSqlWriter {}

impl SqlWriter for PostgresSqlWriter {
    fn write_placeholder(&self, out: &mut String, index: usize) {
        let _ = write!(out, "${}", index);
    }

    fn write_value_blob(&self, out: &mut String, value: &[u8]) {
        out.push_str("'\\x");
        for b in value {
            let _ = write!(out, "{:02x}", b);
        }
        out.push('\'');
    }
}
