// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Erik van der Tier

// CLI entrypoint for asm14.

fn main() {
    let use_color = std::env::var("NO_COLOR").is_err();
    match asm14::assembler::run() {
        Ok(reports) => {
            let mut failed = false;
            for report in &reports {
                for block in asm14::report::render(report, use_color) {
                    eprintln!("{block}");
                }
                if report.error_count() > 0 {
                    failed = true;
                }
            }
            if failed {
                std::process::exit(1);
            }
        }
        Err(err) => {
            eprintln!("{err}");
            std::process::exit(1);
        }
    }
}
