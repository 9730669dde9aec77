// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

//! Writers for the object, entry and extern output files.
//!
//! The object file starts with the code and data word counts, then one line
//! per memory word from address 100: a 4-digit decimal address, a tab, and
//! the word as 5-digit octal. Entry and extern lines pair a symbol name
//! with a 4-digit decimal address.

use std::io::{self, Write};

use crate::core::imagestore::ExternUse;
use crate::core::isa::CODE_BASE;

/// One exported symbol, in `.entry`-directive order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryExport {
    pub name: String,
    pub addr: u16,
}

pub fn write_object<W: Write>(mut out: W, code: &[u16], data: &[u16]) -> io::Result<()> {
    writeln!(out, "{} {}", code.len(), data.len())?;
    for (ix, word) in code.iter().chain(data.iter()).enumerate() {
        writeln!(out, "{:04}\t{:05o}", CODE_BASE as usize + ix, word)?;
    }
    Ok(())
}

pub fn write_entries<W: Write>(mut out: W, entries: &[EntryExport]) -> io::Result<()> {
    for entry in entries {
        writeln!(out, "{}\t{:04}", entry.name, entry.addr)?;
    }
    Ok(())
}

pub fn write_externs<W: Write>(mut out: W, uses: &[ExternUse]) -> io::Result<()> {
    for ext in uses {
        writeln!(out, "{}\t{:04}", ext.name, ext.addr)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{write_entries, write_externs, write_object, EntryExport};
    use crate::core::imagestore::ExternUse;

    fn to_text(bytes: Vec<u8>) -> String {
        String::from_utf8(bytes).unwrap()
    }

    #[test]
    fn object_header_counts_code_and_data() {
        let mut out = Vec::new();
        write_object(&mut out, &[0o07400], &[6, 0o37767, 15]).unwrap();
        let text = to_text(out);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(
            lines,
            vec![
                "1 3",
                "0100\t07400",
                "0101\t00006",
                "0102\t37767",
                "0103\t00017",
            ]
        );
    }

    #[test]
    fn empty_object_still_has_a_header() {
        let mut out = Vec::new();
        write_object(&mut out, &[], &[]).unwrap();
        assert_eq!(to_text(out), "0 0\n");
    }

    #[test]
    fn entry_lines_pad_addresses() {
        let mut out = Vec::new();
        write_entries(
            &mut out,
            &[EntryExport {
                name: "LEN".to_string(),
                addr: 100,
            }],
        )
        .unwrap();
        assert_eq!(to_text(out), "LEN\t0100\n");
    }

    #[test]
    fn extern_lines_repeat_per_use() {
        let mut out = Vec::new();
        write_externs(
            &mut out,
            &[
                ExternUse {
                    name: "EXT".to_string(),
                    addr: 101,
                },
                ExternUse {
                    name: "EXT".to_string(),
                    addr: 104,
                },
            ],
        )
        .unwrap();
        assert_eq!(to_text(out), "EXT\t0101\nEXT\t0104\n");
    }
}
