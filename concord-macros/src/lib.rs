//! Attribute macros for the concord runtime.
//!
//! - `#[concord::main]` turns an `async fn main` into a synchronous one
//!   that builds a runtime and blocks on the body.
//! - `#[concord::test]` does the same for a `#[test]` function.
//!
//! Both accept `worker_threads = N` and `thread_name = "..."`.

use proc_macro::{Delimiter, Group, TokenStream, TokenTree};

/// Runtime options given as attribute arguments.
#[derive(Default)]
struct Options {
    worker_threads: Option<usize>,

    /// The string literal as written, quotes included.
    thread_name: Option<String>,
}

impl Options {
    /// Parses `key = value` pairs separated by commas.
    ///
    /// Works on tokens rather than text so that commas inside string
    /// literals are left alone.
    fn parse(attr: TokenStream) -> Result<Self, String> {
        let mut options = Options::default();
        let mut tokens = attr.into_iter();

        while let Some(token) = tokens.next() {
            let key = match token {
                TokenTree::Ident(key) => key.to_string(),
                other => return Err(format!("expected an option name, found `{other}`")),
            };

            match tokens.next() {
                Some(TokenTree::Punct(eq)) if eq.as_char() == '=' => {}
                _ => return Err(format!("expected `{key} = value`")),
            }

            let value = match tokens.next() {
                Some(TokenTree::Literal(value)) => value.to_string(),
                Some(other) => {
                    return Err(format!("`{key}` expects a literal, found `{other}`"));
                }
                None => return Err(format!("missing value for `{key}`")),
            };

            match tokens.next() {
                None => {}
                Some(TokenTree::Punct(comma)) if comma.as_char() == ',' => {}
                Some(other) => return Err(format!("expected `,`, found `{other}`")),
            }

            match key.as_str() {
                "worker_threads" => match value.parse::<usize>() {
                    Ok(0) | Err(_) => {
                        return Err(format!(
                            "`worker_threads` must be a positive integer, found `{value}`"
                        ));
                    }
                    Ok(n) => options.worker_threads = Some(n),
                },
                "thread_name" => {
                    // Plain or raw string; emitted back verbatim.
                    if !matches!(value.chars().next(), Some('"' | 'r')) {
                        return Err(format!(
                            "`thread_name` must be a string literal, found `{value}`"
                        ));
                    }
                    options.thread_name = Some(value);
                }
                other => return Err(format!("unknown runtime option `{other}`")),
            }
        }

        Ok(options)
    }

    /// Source of the expression building the runtime.
    fn builder(&self) -> String {
        let mut builder = String::from("::concord::RuntimeBuilder::new()");

        if let Some(n) = self.worker_threads {
            builder.push_str(&format!(".worker_threads({n})"));
        }

        if let Some(name) = &self.thread_name {
            builder.push_str(&format!(".thread_name({name})"));
        }

        builder.push_str(".build().expect(\"failed to build the concord runtime\")");
        builder
    }
}

fn compile_error(msg: &str) -> TokenStream {
    format!("::core::compile_error!({msg:?});")
        .parse()
        .unwrap_or_default()
}

/// Drops the `async` keyword and wraps the function body in
/// `runtime.block_on(async move { .. })`.
fn rewrite(item: TokenStream, options: &Options) -> Result<Vec<TokenTree>, String> {
    let mut tokens: Vec<TokenTree> = item.into_iter().collect();

    let Some(async_pos) = tokens
        .iter()
        .position(|t| matches!(t, TokenTree::Ident(id) if id.to_string() == "async"))
    else {
        return Err("the function must be declared `async`".to_string());
    };
    tokens.remove(async_pos);

    let Some(pos) = tokens
        .iter()
        .rposition(|t| matches!(t, TokenTree::Group(g) if g.delimiter() == Delimiter::Brace))
    else {
        return Err("expected a function body".to_string());
    };

    let TokenTree::Group(body) = &tokens[pos] else {
        return Err("expected a function body".to_string());
    };

    let new_body = format!(
        "{{
            let runtime = {};
            runtime.block_on(async move {{ {} }})
        }}",
        options.builder(),
        body.stream()
    );

    let stream = new_body.parse::<TokenStream>().map_err(|err| err.to_string())?;
    tokens[pos] = TokenTree::Group(Group::new(Delimiter::Brace, stream));

    Ok(tokens)
}

/// Runs an `async fn main` on a freshly built runtime.
///
/// ```rust,ignore
/// #[concord::main(worker_threads = 2)]
/// async fn main() {
///     // ...
/// }
/// ```
#[proc_macro_attribute]
pub fn main(attr: TokenStream, item: TokenStream) -> TokenStream {
    let tokens = Options::parse(attr).and_then(|options| rewrite(item, &options));

    match tokens {
        Ok(tokens) => tokens.into_iter().collect(),
        Err(msg) => compile_error(&msg),
    }
}

/// Runs an `async` test on its own runtime.
///
/// ```rust,ignore
/// #[concord::test]
/// async fn spawns() {
///     assert_eq!(task::spawn(async { Ok(1) }).await.unwrap(), 1);
/// }
/// ```
#[proc_macro_attribute]
pub fn test(attr: TokenStream, item: TokenStream) -> TokenStream {
    let tokens = match Options::parse(attr).and_then(|options| rewrite(item, &options)) {
        Ok(tokens) => tokens,
        Err(msg) => return compile_error(&msg),
    };

    let mut result: Vec<TokenTree> = match "#[::core::prelude::v1::test]".parse::<TokenStream>() {
        Ok(attr) => attr.into_iter().collect(),
        Err(err) => return compile_error(&err.to_string()),
    };
    result.extend(tokens);

    result.into_iter().collect()
}
