use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

use fernmark_core::{emit_html, emit_html_sanitized, parse};

fn main() {
    let mut input: Option<String> = None;
    let mut sanitized = false;

    for arg in env::args().skip(1) {
        match arg.as_str() {
            "-h" | "--help" => {
                print_usage();
                return;
            }
            "--sanitized" => sanitized = true,
            _ => {
                if input.is_none() {
                    input = Some(arg);
                } else {
                    eprintln!("unexpected argument: {}", arg);
                    print_usage();
                    process::exit(2);
                }
            }
        }
    }

    let source = match input {
        Some(path) => fs::read_to_string(&path).unwrap_or_else(|err| {
            eprintln!("failed to read {}: {}", path, err);
            process::exit(1);
        }),
        None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .unwrap_or_else(|err| {
                    eprintln!("failed to read stdin: {}", err);
                    process::exit(1);
                });
            buffer
        }
    };

    let parsed = parse(&source);
    let html = if sanitized {
        emit_html_sanitized(&parsed.document)
    } else {
        emit_html(&parsed.document)
    };
    println!("{}", html);
}

fn print_usage() {
    eprintln!("Usage: fernmark-cli [--sanitized] [input]");
}
