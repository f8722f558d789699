//! Light static analysis of transaction scripts: contract imports and the
//! names of the transaction's parameters.

use crate::Import;
use once_cell::sync::Lazy;
use regex::Regex;

static IMPORT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"^\s*import\s+(?:"(?P<string>[^"]+)"|(?P<names>[A-Za-z_]\w*(?:\s*,\s*[A-Za-z_]\w*)*)\s+from\s+(?P<address>0x[0-9a-fA-F]+))"#,
    )
    .expect("import pattern is valid")
});

static TRANSACTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\btransaction\s*\(").expect("transaction pattern is valid"));

static IDENT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_]\w*$").expect("identifier pattern is valid"));

/// Contracts imported by `script`, in source order.
pub fn imports(script: &str) -> Vec<Import> {
    let source = strip_comments(script);
    let mut out = Vec::new();
    for statement in source.lines().flat_map(|line| line.split(';')) {
        let Some(caps) = IMPORT_RE.captures(statement) else {
            continue;
        };
        if let Some(name) = caps.name("string") {
            out.push(Import {
                name: name.as_str().to_string(),
                address: String::new(),
            });
            continue;
        }
        if let (Some(names), Some(address)) = (caps.name("names"), caps.name("address")) {
            for name in names.as_str().split(',') {
                out.push(Import {
                    name: name.trim().to_string(),
                    address: address.as_str().to_string(),
                });
            }
        }
    }
    out
}

/// Names of the parameters declared by the `transaction(...)` header.
///
/// Returns `None` when the script has no recognisable header.
pub fn parameter_names(script: &str) -> Option<Vec<String>> {
    let source = strip_comments(script);
    let start = TRANSACTION_RE.find(&source)?.end();

    let mut depth = 0usize;
    let mut current = String::new();
    let mut params = Vec::new();
    for ch in source[start..].chars() {
        match ch {
            '(' | '[' | '{' | '<' => {
                depth += 1;
                current.push(ch);
            }
            ')' if depth == 0 => {
                if !current.trim().is_empty() {
                    params.push(current);
                }
                return params.iter().map(|p| parameter_name(p)).collect();
            }
            ')' | ']' | '}' | '>' => {
                depth = depth.saturating_sub(1);
                current.push(ch);
            }
            ',' if depth == 0 => params.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    None
}

fn parameter_name(param: &str) -> Option<String> {
    let (name, _ty) = param.split_once(':')?;
    let name = name.trim();
    IDENT_RE.is_match(name).then(|| name.to_string())
}

/// Remove `//` and (nestable) `/* */` comments, leaving string literals intact.
fn strip_comments(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut chars = source.chars().peekable();
    let mut in_string = false;
    let mut block_depth = 0usize;

    while let Some(ch) = chars.next() {
        let next = chars.peek().copied();
        if block_depth > 0 {
            match (ch, next) {
                ('*', Some('/')) => {
                    chars.next();
                    block_depth -= 1;
                }
                ('/', Some('*')) => {
                    chars.next();
                    block_depth += 1;
                }
                ('\n', _) => out.push('\n'),
                _ => {}
            }
            continue;
        }
        if in_string {
            out.push(ch);
            match ch {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match (ch, next) {
            ('"', _) => {
                in_string = true;
                out.push(ch);
            }
            ('/', Some('/')) => {
                for rest in chars.by_ref() {
                    if rest == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            ('/', Some('*')) => {
                chars.next();
                block_depth = 1;
            }
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRANSFER: &str = r#"
import FungibleToken from 0xf233dcee88fe0abe
import FlowToken from 0x1654653399040a61
// import Ignored from 0x01

/* transaction(fake: String) */
transaction(amount: UFix64, to: Address) {
    let sentVault: @{FungibleToken.Vault}

    prepare(signer: auth(BorrowValue) &Account) {
        log("transaction(notThis: Int)")
    }
}
"#;

    #[test]
    fn test_imports_in_source_order() {
        let found = imports(TRANSFER);
        assert_eq!(
            found,
            vec![
                Import {
                    name: "FungibleToken".into(),
                    address: "0xf233dcee88fe0abe".into()
                },
                Import {
                    name: "FlowToken".into(),
                    address: "0x1654653399040a61".into()
                },
            ]
        );
    }

    #[test]
    fn test_multi_name_and_string_imports() {
        let found = imports("import A, B from 0x01\nimport \"C\"\n");
        let names: Vec<_> = found.iter().map(|i| i.name.as_str()).collect();
        assert_eq!(names, vec!["A", "B", "C"]);
        assert_eq!(found[1].address, "0x01");
        assert_eq!(found[2].address, "");
    }

    #[test]
    fn test_imports_sharing_a_line() {
        let found = imports("import A from 0x01; import B from 0x02;\ntransaction {}\n");
        assert_eq!(
            found,
            vec![
                Import {
                    name: "A".into(),
                    address: "0x01".into()
                },
                Import {
                    name: "B".into(),
                    address: "0x02".into()
                },
            ]
        );
    }

    #[test]
    fn test_parameter_names_skip_comments() {
        assert_eq!(
            parameter_names(TRANSFER),
            Some(vec!["amount".to_string(), "to".to_string()])
        );
    }

    #[test]
    fn test_parameter_names_nested_types() {
        let script = "transaction(ids: [UInt64], meta: {String: [Address]}, cap: Capability<&A.B>) {}";
        assert_eq!(
            parameter_names(script),
            Some(vec!["ids".into(), "meta".into(), "cap".into()])
        );
    }

    #[test]
    fn test_parameter_names_empty_and_missing() {
        assert_eq!(parameter_names("transaction() {}"), Some(vec![]));
        assert_eq!(parameter_names("transaction {}"), None);
        assert_eq!(parameter_names("pub fun main(): Int { return 1 }"), None);
    }
}
