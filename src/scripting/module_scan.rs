//! 模块依赖扫描
//!
//! 轻量词法扫描，找出 ES 模块源码中的静态 `import`、`export ... from`
//! 以及字面量形式的 `import("...")`。用于在求值之前预先解析依赖图，
//! 使缺失的依赖以"实例化失败"报告，并为热重载建立依赖关系。

/// 依赖的引入方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    /// `import x from "..."` / `import "..."`
    Static,
    /// `export ... from "..."`
    ReExport,
    /// `import("...")`
    Dynamic,
}

/// 源码中出现的一个模块说明符
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSpecifier {
    pub specifier: String,
    pub kind: ImportKind,
}

impl ImportSpecifier {
    /// 静态依赖在实例化时必须可解析
    pub fn is_static(&self) -> bool {
        !matches!(self.kind, ImportKind::Dynamic)
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Ident(String),
    Str(String),
    Punct(char),
    Other,
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn tokenize(source: &str) -> Vec<Token> {
    let chars: Vec<char> = source.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        match c {
            c if c.is_whitespace() => i += 1,
            '/' if chars.get(i + 1) == Some(&'/') => {
                while i < chars.len() && chars[i] != '\n' {
                    i += 1;
                }
            }
            '/' if chars.get(i + 1) == Some(&'*') => {
                i += 2;
                while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                    i += 1;
                }
                i += 2;
            }
            '\'' | '"' => {
                let quote = c;
                let mut text = String::new();
                i += 1;
                while i < chars.len() && chars[i] != quote && chars[i] != '\n' {
                    if chars[i] == '\\' && i + 1 < chars.len() {
                        text.push(chars[i + 1]);
                        i += 2;
                    } else {
                        text.push(chars[i]);
                        i += 1;
                    }
                }
                i += 1;
                tokens.push(Token::Str(text));
            }
            '`' => {
                i = skip_template(&chars, i + 1);
                tokens.push(Token::Other);
            }
            c if is_ident_start(c) => {
                let start = i;
                while i < chars.len() && is_ident_continue(chars[i]) {
                    i += 1;
                }
                tokens.push(Token::Ident(chars[start..i].iter().collect()));
            }
            c if c.is_ascii_digit() => {
                while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '.') {
                    i += 1;
                }
                tokens.push(Token::Other);
            }
            c => {
                tokens.push(Token::Punct(c));
                i += 1;
            }
        }
    }

    tokens
}

/// 跳过模板字符串，返回结束反引号之后的位置
fn skip_template(chars: &[char], mut i: usize) -> usize {
    let mut depth = 0usize;
    while i < chars.len() {
        match chars[i] {
            '\\' => i += 2,
            '`' if depth == 0 => return i + 1,
            '$' if depth == 0 && chars.get(i + 1) == Some(&'{') => {
                depth = 1;
                i += 2;
            }
            '{' if depth > 0 => {
                depth += 1;
                i += 1;
            }
            '}' if depth > 0 => {
                depth -= 1;
                i += 1;
            }
            _ => i += 1,
        }
    }
    i
}

fn is_ident(token: Option<&Token>, name: &str) -> bool {
    matches!(token, Some(Token::Ident(ident)) if ident == name)
}

fn is_punct(token: Option<&Token>, punct: char) -> bool {
    matches!(token, Some(Token::Punct(c)) if *c == punct)
}

/// `from "<specifier>"` 紧跟在位置 `at` 上时返回说明符
fn from_clause(tokens: &[Token], at: usize) -> Option<String> {
    match (tokens.get(at), tokens.get(at + 1)) {
        (Some(Token::Ident(kw)), Some(Token::Str(spec))) if kw == "from" => Some(spec.clone()),
        _ => None,
    }
}

/// import 子句：向前查找 `from "..."`，遇到语句结束或下一个 import/export 即停止
fn find_import_source(tokens: &[Token], start: usize) -> Option<String> {
    let mut j = start;
    while j < tokens.len() {
        if is_punct(tokens.get(j), ';') {
            return None;
        }
        if j > start && (is_ident(tokens.get(j), "import") || is_ident(tokens.get(j), "export")) {
            return None;
        }
        if let Some(spec) = from_clause(tokens, j) {
            return Some(spec);
        }
        j += 1;
    }
    None
}

/// `export { ... } from` / `export * from` / `export * as ns from`
fn find_reexport_source(tokens: &[Token], start: usize) -> Option<String> {
    if is_punct(tokens.get(start), '{') {
        let mut j = start + 1;
        while j < tokens.len() && !is_punct(tokens.get(j), '}') {
            j += 1;
        }
        return from_clause(tokens, j + 1);
    }
    if is_punct(tokens.get(start), '*') {
        if is_ident(tokens.get(start + 1), "as") {
            return from_clause(tokens, start + 3);
        }
        return from_clause(tokens, start + 1);
    }
    None
}

/// 扫描源码中的模块说明符，按出现顺序返回
pub fn scan_imports(source: &str) -> Vec<ImportSpecifier> {
    let tokens = tokenize(source);
    let mut imports = Vec::new();

    for (i, token) in tokens.iter().enumerate() {
        let Token::Ident(keyword) = token else {
            continue;
        };
        // obj.import / obj.export 是属性访问
        if i > 0 && is_punct(tokens.get(i - 1), '.') {
            continue;
        }

        match keyword.as_str() {
            "import" => match tokens.get(i + 1) {
                Some(Token::Punct('(')) => {
                    if let Some(Token::Str(spec)) = tokens.get(i + 2) {
                        if is_punct(tokens.get(i + 3), ')') || is_punct(tokens.get(i + 3), ',') {
                            imports.push(ImportSpecifier {
                                specifier: spec.clone(),
                                kind: ImportKind::Dynamic,
                            });
                        }
                    }
                }
                Some(Token::Punct('.')) => {}
                Some(Token::Str(spec)) => imports.push(ImportSpecifier {
                    specifier: spec.clone(),
                    kind: ImportKind::Static,
                }),
                Some(_) => {
                    if let Some(spec) = find_import_source(&tokens, i + 1) {
                        imports.push(ImportSpecifier {
                            specifier: spec,
                            kind: ImportKind::Static,
                        });
                    }
                }
                None => {}
            },
            "export" => {
                if let Some(spec) = find_reexport_source(&tokens, i + 1) {
                    imports.push(ImportSpecifier {
                        specifier: spec,
                        kind: ImportKind::ReExport,
                    });
                }
            }
            _ => {}
        }
    }

    imports
}

#[cfg(test)]
mod tests {
    use super::*;

    fn specifiers(source: &str) -> Vec<(String, ImportKind)> {
        scan_imports(source)
            .into_iter()
            .map(|import| (import.specifier, import.kind))
            .collect()
    }

    #[test]
    fn test_static_import_forms() {
        let source = r#"
            import JSEngine from './JSEngine.mjs';
            import { add, sub as minus } from "./math.mjs";
            import * as input from './InputSystem.mjs'
            import Default, { named } from "./both.js";
            import './side-effect.mjs';
        "#;
        assert_eq!(
            specifiers(source),
            vec![
                ("./JSEngine.mjs".to_string(), ImportKind::Static),
                ("./math.mjs".to_string(), ImportKind::Static),
                ("./InputSystem.mjs".to_string(), ImportKind::Static),
                ("./both.js".to_string(), ImportKind::Static),
                ("./side-effect.mjs".to_string(), ImportKind::Static),
            ]
        );
    }

    #[test]
    fn test_reexports_and_local_exports() {
        let source = r#"
            export { add } from './math.mjs';
            export * from "./all.mjs";
            export * as util from './util.mjs';
            export const label = "not a module";
            export function from() { return "nope"; }
            export { label as name };
        "#;
        assert_eq!(
            specifiers(source),
            vec![
                ("./math.mjs".to_string(), ImportKind::ReExport),
                ("./all.mjs".to_string(), ImportKind::ReExport),
                ("./util.mjs".to_string(), ImportKind::ReExport),
            ]
        );
    }

    #[test]
    fn test_dynamic_imports() {
        let source = r#"
            const math = await import('./math.mjs');
            const name = './computed.mjs';
            import(name).then(() => {});
            console.log(import.meta.url);
        "#;
        assert_eq!(
            specifiers(source),
            vec![("./math.mjs".to_string(), ImportKind::Dynamic)]
        );
    }

    #[test]
    fn test_comments_and_strings_are_ignored() {
        let source = r#"
            // import x from './commented.mjs';
            /* import y from './block.mjs'; */
            const text = "import z from './in-string.mjs'";
            const tpl = `import w from './template.mjs' ${1 + 2}`;
            loader.import('./method-call.mjs');
            import real from './real.mjs';
        "#;
        assert_eq!(
            specifiers(source),
            vec![("./real.mjs".to_string(), ImportKind::Static)]
        );
    }

    #[test]
    fn test_static_flag() {
        let imports = scan_imports("import a from './a.mjs'; import('./b.mjs');");
        assert!(imports[0].is_static());
        assert!(!imports[1].is_static());
    }
}
