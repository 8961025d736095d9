//! Textual macro definitions and whole-word expansion (spec.md §4.8).

use std::collections::HashMap;

use crate::error::AsmError;
use crate::token::{clean_line, split_mnemonic_args};

struct MacroDef {
    params: Vec<String>,
    body: Vec<String>,
}

/// Scans raw source lines for `.macro`/`.endmacro` blocks, removes them from
/// the stream, and expands every invocation elsewhere. Expansion is a single
/// pass: a macro body may not itself invoke another macro.
pub fn expand(raw_lines: &[&str]) -> Result<Vec<(usize, String)>, AsmError> {
    let mut macros: HashMap<String, MacroDef> = HashMap::new();
    let mut without_defs: Vec<(usize, String)> = Vec::new();

    let mut lines = raw_lines.iter().enumerate().map(|(i, l)| (i + 1, *l)).peekable();
    while let Some((line_no, raw)) = lines.next() {
        let Some(cleaned) = clean_line(raw) else { continue };
        if let Some(rest) = cleaned.strip_prefix(".macro ").or_else(|| cleaned.strip_prefix(".macro\t")) {
            let mut tokens = rest.split_whitespace();
            let name = tokens
                .next()
                .ok_or_else(|| AsmError::BadArgument { detail: "`.macro` needs a name".to_string(), line: line_no })?
                .to_string();
            let params: Vec<String> = tokens.map(ToString::to_string).collect();
            let mut body = Vec::new();
            loop {
                let Some((body_line_no, body_raw)) = lines.next() else {
                    return Err(AsmError::BadArgument {
                        detail: format!("`.macro {name}` missing `.endmacro`"),
                        line: line_no,
                    });
                };
                let Some(body_cleaned) = clean_line(body_raw) else { continue };
                if body_cleaned.eq_ignore_ascii_case(".endmacro") {
                    break;
                }
                let _ = body_line_no;
                body.push(body_cleaned);
            }
            macros.insert(name.to_ascii_uppercase(), MacroDef { params, body });
        } else {
            without_defs.push((line_no, cleaned));
        }
    }

    let mut expanded = Vec::new();
    for (line_no, line) in without_defs {
        let (head, _) = split_mnemonic_args(&line);
        if let Some(def) = macros.get(&head.to_ascii_uppercase()) {
            let (_, args) = split_mnemonic_args(&line);
            if args.len() != def.params.len() {
                return Err(AsmError::BadArgument {
                    detail: format!(
                        "macro `{head}` expects {} argument(s), got {}",
                        def.params.len(),
                        args.len()
                    ),
                    line: line_no,
                });
            }
            for body_line in &def.body {
                expanded.push((line_no, substitute(body_line, &def.params, &args)));
            }
        } else {
            expanded.push((line_no, line));
        }
    }
    Ok(expanded)
}

/// Whole-word substitution of macro parameter names with argument tokens;
/// an identifier embedded in a longer word is left untouched.
fn substitute(body_line: &str, params: &[String], args: &[String]) -> String {
    let mut out = String::new();
    let mut word = String::new();
    for c in body_line.chars() {
        if c.is_alphanumeric() || c == '_' {
            word.push(c);
        } else {
            flush_word(&mut word, &mut out, params, args);
            out.push(c);
        }
    }
    flush_word(&mut word, &mut out, params, args);
    out
}

fn flush_word(word: &mut String, out: &mut String, params: &[String], args: &[String]) {
    if word.is_empty() {
        return;
    }
    if let Some(pos) = params.iter().position(|p| p.eq_ignore_ascii_case(word)) {
        out.push_str(&args[pos]);
    } else {
        out.push_str(word);
    }
    word.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_macro_invocation_with_substitution() {
        let src = [".macro DOUBLE dst, src", "ADD dst, src", ".endmacro", "DOUBLE r1, r2"];
        let out = expand(&src).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].1, "ADD r1, r2");
    }

    #[test]
    fn non_macro_lines_pass_through_unchanged() {
        let src = ["MOVI r1, 5", "HLT"];
        let out = expand(&src).unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].1, "MOVI r1, 5");
        assert_eq!(out[1].1, "HLT");
    }

    #[test]
    fn does_not_substitute_inside_a_longer_identifier() {
        let src = [".macro SET x", "MOVI rx, x", ".endmacro", "SET 7"];
        // "rx" does not contain the whole word "x" as a separate token, so it
        // must be left alone; only the standalone "x" argument substitutes.
        let out = expand(&src).unwrap();
        assert_eq!(out[0].1, "MOVI rx, 7");
    }
}
