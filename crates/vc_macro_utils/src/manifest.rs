use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::{PoisonError, RwLock};
use std::time::SystemTime;

use proc_macro2::Span;
use toml_edit::{Document, Item, Table};

/// Locates the path under which generated code can reach a workspace crate.
///
/// Derive output such as `impl ::vc_serialize::Reflect for Foo` must name the
/// crate the way the *invoking* crate sees it, which depends on that crate's
/// `Cargo.toml`.
///
/// # Example
///
/// ```rust
/// # use vc_macro_utils::Manifest;
/// let path: syn::Path = Manifest::shared(|m| m.get_crate_path("vc_serialize"));
/// ```
///
/// # Resolution rules
///
/// 1. A direct dependency on the crate resolves to `::crate_name`.
/// 2. A `vc_` crate reached through the `serialize_context` facade resolves to
///    `::serialize_context::short_name` (`vc_serialize` -> `::serialize_context::serialize`).
/// 3. Steps 1 and 2 are repeated for `dev-dependencies`.
/// 4. Everything else falls back to `::crate_name`.
///
/// A crate referring to itself should declare `extern crate self as vc_serialize;`
/// so that rule 4 also holds inside the crate.
#[derive(Debug)]
pub struct Manifest {
    pub manifest: Option<Document<Box<str>>>,
    pub modified_time: SystemTime,
}

const FACADE_NAME: &str = "serialize_context";
const CRATE_PREFIX: &str = "vc_";

impl Manifest {
    #[inline(never)]
    fn manifest_path() -> Option<PathBuf> {
        let mut path = PathBuf::from(env::var_os("CARGO_MANIFEST_DIR")?);
        path.push("Cargo.toml");
        path.exists().then_some(path)
    }

    #[inline(never)]
    fn modified_time(path: &Path) -> Option<SystemTime> {
        std::fs::metadata(path).and_then(|meta| meta.modified()).ok()
    }

    #[inline(never)]
    fn read_manifest(path: &Path) -> Option<Document<Box<str>>> {
        let text = std::fs::read_to_string(path).ok()?.into_boxed_str();
        Document::parse(text).ok()
    }

    fn crate_root(name: &str) -> syn::Path {
        let ident = syn::Ident::new(name, Span::call_site());
        let mut path = syn::Path::from(ident);
        path.leading_colon = Some(Default::default());
        path
    }

    fn find_in_deps(deps: &Table, name: &str) -> Option<syn::Path> {
        if deps.contains_key(name) {
            return Some(Self::crate_root(name));
        }
        let module = name.strip_prefix(CRATE_PREFIX)?;
        if deps.contains_key(FACADE_NAME) {
            let mut path = Self::crate_root(FACADE_NAME);
            path.segments
                .push(syn::Ident::new(module, Span::call_site()).into());
            return Some(path);
        }
        None
    }

    /// Returns the [`syn::Path`] of the package `name` as seen from the
    /// invoking crate. See the type documentation for the rules.
    #[inline(never)]
    pub fn get_crate_path(&self, name: &str) -> syn::Path {
        let Some(manifest) = &self.manifest else {
            return Self::crate_root(name);
        };
        for table in ["dependencies", "dev-dependencies"] {
            if let Some(Item::Table(deps)) = manifest.get(table)
                && let Some(path) = Self::find_in_deps(deps, name)
            {
                return path;
            }
        }
        Self::crate_root(name)
    }

    /// Runs `func` with the invoking crate's manifest.
    ///
    /// Manifests are cached per path and re-read when the file changes. When
    /// the manifest cannot be read, an empty one is used, which resolves every
    /// name through the fallback rule.
    pub fn shared<R>(func: impl FnOnce(&Self) -> R) -> R {
        static MANIFESTS: RwLock<BTreeMap<PathBuf, Manifest>> = RwLock::new(BTreeMap::new());

        let Some(path) = Self::manifest_path() else {
            return func(&Self::empty());
        };
        let modified_time = Self::modified_time(&path).unwrap_or(SystemTime::UNIX_EPOCH);

        let manifests = MANIFESTS.read().unwrap_or_else(PoisonError::into_inner);
        if let Some(manifest) = manifests.get(&path)
            && manifest.modified_time == modified_time
        {
            return func(manifest);
        }
        drop(manifests);

        let Some(document) = Self::read_manifest(&path) else {
            return func(&Self::empty());
        };
        let manifest = Manifest {
            manifest: Some(document),
            modified_time,
        };
        let result = func(&manifest);

        MANIFESTS
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(path, manifest);

        result
    }

    fn empty() -> Self {
        Self {
            manifest: None,
            modified_time: SystemTime::UNIX_EPOCH,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Manifest;
    use std::time::SystemTime;
    use toml_edit::Document;

    fn manifest(text: &str) -> Manifest {
        Manifest {
            manifest: Some(Document::parse(Box::<str>::from(text)).unwrap()),
            modified_time: SystemTime::UNIX_EPOCH,
        }
    }

    fn render(path: &syn::Path) -> String {
        path.segments
            .iter()
            .map(|s| s.ident.to_string())
            .collect::<Vec<_>>()
            .join("::")
    }

    #[test]
    fn direct_dependency_wins() {
        let m = manifest("[dependencies]\nvc_serialize = \"0.0.1\"\n");
        assert_eq!(render(&m.get_crate_path("vc_serialize")), "vc_serialize");
    }

    #[test]
    fn facade_dependency_maps_short_name() {
        let m = manifest("[dev-dependencies]\nserialize_context = \"0.0.1\"\n");
        assert_eq!(
            render(&m.get_crate_path("vc_serialize")),
            "serialize_context::serialize"
        );
    }
}
