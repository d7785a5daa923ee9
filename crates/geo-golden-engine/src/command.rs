//! Command construction from templated command lines.
//!
//! A template such as
//!
//! ```text
//! gpt Subset -Ssource={SRC:MER_RR} -PregionWkt="POLYGON((...))"
//! ```
//!
//! has its `{CATEGORY:id}` tokens replaced by absolute resource paths, is split
//! into arguments (respecting double-quoted segments), and receives the output
//! format (`-f`) and target path (`-t`) flags.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use geo_golden_core::{Error, ResourceCatalog, Result};

use crate::format::FormatRegistry;

/// Output format flag.
pub const FORMAT_FLAG: &str = "-f";

/// Output path flag.
pub const TARGET_FLAG: &str = "-t";

lazy_static! {
    static ref TOKEN_PATTERN: Regex = Regex::new(r"\{(.+?)\}").unwrap();
}

/// Everything command construction needs from the environment.
///
/// Passed explicitly into every build so construction has no hidden state.
#[derive(Clone, Copy)]
pub struct CommandContext<'a> {
    /// Resources referenced by templates
    pub catalog: &'a ResourceCatalog,
    /// Writer formats
    pub registry: &'a dyn FormatRegistry,
    /// Format used when a template has no `-f` flag
    pub default_format: &'a str,
    /// Root relative resource paths resolve against
    pub root: &'a Path,
}

impl std::fmt::Debug for CommandContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandContext")
            .field("default_format", &self.default_format)
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// A ready-to-run argument vector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltCommand {
    /// Arguments; the first is the executable
    pub args: Vec<String>,
    /// Output format in effect
    pub format: String,
    /// File the tool is asked to write
    pub target_path: PathBuf,
}

/// Builds tool command lines for tests.
#[derive(Debug, Clone, Copy)]
pub struct CommandBuilder<'a> {
    context: CommandContext<'a>,
}

impl<'a> CommandBuilder<'a> {
    /// Create a builder over an explicit context.
    pub fn new(context: CommandContext<'a>) -> Self {
        Self { context }
    }

    /// Replace every `{CATEGORY:id}` token with the resource's absolute path.
    pub fn expand_tokens(&self, template: &str) -> Result<String> {
        let mut expanded = String::with_capacity(template.len());
        let mut last = 0;

        for caps in TOKEN_PATTERN.captures_iter(template) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let mut parts = inner.as_str().split(':');
            let (category, id) = match (parts.next(), parts.next(), parts.next()) {
                (Some(category), Some(id), None) if !category.is_empty() && !id.is_empty() => {
                    (category, id)
                }
                _ => return Err(Error::MalformedToken(whole.as_str().to_string())),
            };

            let resource = self.context.catalog.resolve_token(category, id)?;
            let path = resource.absolute_path(self.context.root);
            debug!("Resolved {} -> {}", whole.as_str(), path.display());

            expanded.push_str(&template[last..whole.start()]);
            expanded.push_str(&path.to_string_lossy());
            last = whole.end();
        }

        expanded.push_str(&template[last..]);
        Ok(expanded)
    }

    /// Build the argument vector for one test.
    ///
    /// The target is `<output_dir>/<test_name><extension>`.
    pub fn build(&self, test_name: &str, template: &str, output_dir: &Path) -> Result<BuiltCommand> {
        let expanded = self.expand_tokens(template)?;
        let mut args = tokenize(&expanded);
        if args.is_empty() {
            return Err(Error::InvalidInput(format!(
                "command template for '{test_name}' is empty"
            )));
        }

        strip_flag(&mut args, TARGET_FLAG, test_name);

        let format_index = match args.iter().position(|arg| arg == FORMAT_FLAG) {
            Some(index) => {
                if index + 1 >= args.len() {
                    return Err(Error::InvalidInput(format!(
                        "'{FORMAT_FLAG}' flag without a format in command for '{test_name}'"
                    )));
                }
                index
            }
            None => {
                args.insert(1, FORMAT_FLAG.to_string());
                args.insert(2, self.context.default_format.to_string());
                1
            }
        };
        let format = args[format_index + 1].clone();

        let extension = self.context.registry.output_extension(&format)?;
        let target_path = output_dir.join(format!("{test_name}{extension}"));

        args.insert(format_index + 2, TARGET_FLAG.to_string());
        args.insert(
            format_index + 3,
            target_path.to_string_lossy().into_owned(),
        );

        Ok(BuiltCommand {
            args,
            format,
            target_path,
        })
    }
}

/// Remove a user-supplied flag and its value; the harness owns it.
fn strip_flag(args: &mut Vec<String>, flag: &str, test_name: &str) {
    while let Some(index) = args.iter().position(|arg| arg == flag) {
        warn!(
            "Ignoring '{}' in command for '{}'; the harness sets it",
            flag, test_name
        );
        let end = (index + 2).min(args.len());
        args.drain(index..end);
    }
}

/// Split a command line on whitespace, keeping double-quoted segments together.
///
/// Quote characters are removed from the resulting arguments. There is no
/// escaping beyond quote pairing; an unmatched quote runs to the end of input.
pub fn tokenize(command: &str) -> Vec<String> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut has_token = false;

    for c in command.chars() {
        match c {
            '"' => {
                in_quotes = !in_quotes;
                has_token = true;
            }
            c if c.is_whitespace() && !in_quotes => {
                if has_token {
                    args.push(std::mem::take(&mut current));
                    has_token = false;
                }
            }
            c => {
                current.push(c);
                has_token = true;
            }
        }
    }

    if has_token {
        args.push(current);
    }
    args
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::StaticFormatRegistry;
    use geo_golden_core::{Resource, ResourceCategory};

    fn catalog() -> ResourceCatalog {
        let mut catalog = ResourceCatalog::new();
        catalog
            .insert(Resource {
                id: "MER_RR".to_string(),
                category: ResourceCategory::Src,
                path: "products/MER_RR.N1".to_string(),
                description: None,
            })
            .unwrap();
        catalog
            .insert(Resource {
                id: "subset".to_string(),
                category: ResourceCategory::Gph,
                path: "/graphs/subset.xml".to_string(),
                description: None,
            })
            .unwrap();
        catalog
    }

    fn with_builder<T>(f: impl FnOnce(CommandBuilder<'_>) -> T) -> T {
        let catalog = catalog();
        let registry = StaticFormatRegistry::with_defaults();
        let context = CommandContext {
            catalog: &catalog,
            registry: &registry,
            default_format: "BEAM-DIMAP",
            root: Path::new("/env"),
        };
        f(CommandBuilder::new(context))
    }

    #[test]
    fn test_tokenize_plain() {
        assert_eq!(tokenize("gpt  Subset\t-x"), vec!["gpt", "Subset", "-x"]);
        assert!(tokenize("   ").is_empty());
    }

    #[test]
    fn test_tokenize_quotes() {
        assert_eq!(tokenize(r#"a "b c" d"#), vec!["a", "b c", "d"]);
        assert_eq!(
            tokenize(r#"-PgeoRegion="POLYGON((1 2, 3 4))" x"#),
            vec!["-PgeoRegion=POLYGON((1 2, 3 4))", "x"]
        );
    }

    #[test]
    fn test_tokenize_empty_quotes_is_token() {
        assert_eq!(tokenize(r#"a "" b"#), vec!["a", "", "b"]);
    }

    #[test]
    fn test_expand_tokens() {
        with_builder(|builder| {
            let expanded = builder
                .expand_tokens("gpt {GPH:subset} -Ssource={SRC:MER_RR}")
                .unwrap();
            assert_eq!(
                expanded,
                "gpt /graphs/subset.xml -Ssource=/env/products/MER_RR.N1"
            );
        });
    }

    #[test]
    fn test_unknown_resource_names_category_and_id() {
        with_builder(|builder| {
            let err = builder.expand_tokens("gpt {AUX:dem}").unwrap_err();
            assert!(matches!(
                err,
                Error::UnknownResource { category: ResourceCategory::Aux, ref id } if id == "dem"
            ));
        });
    }

    #[test]
    fn test_malformed_tokens() {
        with_builder(|builder| {
            for template in ["gpt {SRC}", "gpt {SRC:a:b}", "gpt {:a}", "gpt {SRC:}"] {
                let err = builder.expand_tokens(template).unwrap_err();
                assert!(
                    matches!(err, Error::MalformedToken(_)),
                    "{template} should be malformed, got {err}"
                );
            }
        });
    }

    #[test]
    fn test_unknown_category() {
        with_builder(|builder| {
            let err = builder.expand_tokens("gpt {XYZ:a}").unwrap_err();
            assert!(matches!(err, Error::UnknownCategory(ref c) if c == "XYZ"));
        });
    }

    #[test]
    fn test_default_format_injected_after_executable() {
        with_builder(|builder| {
            let built = builder
                .build("subset", "gpt Subset -Ssource={SRC:MER_RR}", Path::new("/out"))
                .unwrap();
            assert_eq!(
                built.args,
                vec![
                    "gpt",
                    "-f",
                    "BEAM-DIMAP",
                    "-t",
                    "/out/subset.dim",
                    "Subset",
                    "-Ssource=/env/products/MER_RR.N1",
                ]
            );
            assert_eq!(built.format, "BEAM-DIMAP");
            assert_eq!(built.target_path, PathBuf::from("/out/subset.dim"));
        });
    }

    #[test]
    fn test_explicit_format_is_kept() {
        with_builder(|builder| {
            let built = builder
                .build("t1", "gpt Subset -f GeoTIFF -x 1", Path::new("/out"))
                .unwrap();
            assert_eq!(
                built.args,
                vec!["gpt", "Subset", "-f", "GeoTIFF", "-t", "/out/t1.tif", "-x", "1"]
            );
            assert_eq!(built.args.iter().filter(|a| *a == "-f").count(), 1);
        });
    }

    #[test]
    fn test_user_target_flag_replaced() {
        with_builder(|builder| {
            let built = builder
                .build("t1", "gpt Subset -t /somewhere/else.dim", Path::new("/out"))
                .unwrap();
            assert_eq!(
                built.args,
                vec!["gpt", "-f", "BEAM-DIMAP", "-t", "/out/t1.dim", "Subset"]
            );
        });
    }

    #[test]
    fn test_unsupported_format() {
        with_builder(|builder| {
            let err = builder
                .build("t1", "gpt Subset -f PNG", Path::new("/out"))
                .unwrap_err();
            assert!(matches!(err, Error::UnsupportedFormat(_)));
        });
    }

    #[test]
    fn test_dangling_format_flag() {
        with_builder(|builder| {
            assert!(builder
                .build("t1", "gpt Subset -f", Path::new("/out"))
                .is_err());
        });
    }

    #[test]
    fn test_empty_template() {
        with_builder(|builder| {
            assert!(matches!(
                builder.build("t1", "  ", Path::new("/out")),
                Err(Error::InvalidInput(_))
            ));
        });
    }
}
