//! URI normalization and JSON pointer helpers
//!
//! Every location handled by the repository passes through [`normalize`],
//! which rebuilds the fragment from its decoded pointer tokens. Applying it
//! twice yields the same URL.

use std::path::Path;
use url::Url;

use crate::error::{GenError, Result};

/// Parse `s` as an absolute URI, or as a filesystem path when it has no scheme.
///
/// Returns `Ok(None)` for relative references that need a base to resolve.
pub fn parse_absolute(s: &str) -> Result<Option<Url>> {
    match Url::parse(s) {
        // Single-letter schemes are Windows drive letters, not URIs
        Ok(url) if url.scheme().len() > 1 => Ok(Some(normalize(url))),
        _ => {
            let (path_part, fragment) = split_fragment(s);
            let path = Path::new(path_part);
            if !path.is_absolute() {
                return Ok(None);
            }
            let mut url = Url::from_file_path(path).map_err(|_| GenError::InvalidUri(s.to_string()))?;
            url.set_fragment(fragment);
            Ok(Some(normalize(url)))
        }
    }
}

/// Turn a local path (absolute or relative to the working directory) into a `file:` URL
pub fn from_path(path: &Path) -> Result<Url> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        std::env::current_dir()?.join(path)
    };
    Url::from_file_path(&absolute)
        .map(normalize)
        .map_err(|_| GenError::InvalidUri(path.display().to_string()))
}

/// Treat `s` as a directory location: a trailing slash makes relative joins land inside it
pub fn as_directory(s: &str) -> Result<Url> {
    let url = match parse_absolute(s)? {
        Some(url) => url,
        None => from_path(Path::new(s))?,
    };
    if url.path().ends_with('/') {
        return Ok(url);
    }
    let mut dir = url;
    let path = format!("{}/", dir.path());
    dir.set_path(&path);
    Ok(dir)
}

/// Join a reference onto a base URL and normalize the result
pub fn join(base: &Url, reference: &str) -> Result<Url> {
    base.join(reference)
        .map(normalize)
        .map_err(|e| GenError::InvalidUri(format!("{} relative to {}: {}", reference, base, e)))
}

/// Canonical form: fragment rebuilt from its pointer tokens, empty fragment removed
pub fn normalize(mut url: Url) -> Url {
    let tokens = url.fragment().map(pointer_tokens).unwrap_or_default();
    if tokens.is_empty() {
        url.set_fragment(None);
    } else {
        url.set_fragment(Some(&pointer_from_tokens(&tokens)));
    }
    url
}

/// URL with the fragment stripped
pub fn document_url(url: &Url) -> Url {
    let mut doc = url.clone();
    doc.set_fragment(None);
    doc
}

/// URL pointing at `pointer` inside the document at `doc`
pub fn with_pointer(doc: &Url, pointer: &str) -> Url {
    let mut url = doc.clone();
    if pointer.is_empty() {
        url.set_fragment(None);
    } else {
        url.set_fragment(Some(pointer));
    }
    url
}

/// Decode a fragment into unescaped JSON pointer tokens
///
/// Empty segments are keys like any other: `/a//b` addresses `""` under `a`.
/// A fragment without a leading `/` is read as a single-segment pointer.
pub fn pointer_tokens(fragment: &str) -> Vec<String> {
    let decoded = String::from_utf8_lossy(&urlencoding::decode_binary(fragment.as_bytes())).into_owned();
    if decoded.is_empty() {
        return Vec::new();
    }
    let body = decoded.strip_prefix('/').unwrap_or(&decoded);
    body.split('/')
        .map(|s| s.replace("~1", "/").replace("~0", "~"))
        .collect()
}

/// Encode tokens as a JSON pointer (`""` for the document root)
pub fn pointer_from_tokens<S: AsRef<str>>(tokens: &[S]) -> String {
    tokens
        .iter()
        .map(|t| format!("/{}", escape_token(t.as_ref())))
        .collect()
}

/// Append one token to an encoded pointer
pub fn child_pointer(pointer: &str, token: &str) -> String {
    format!("{}/{}", pointer, escape_token(token))
}

pub fn escape_token(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn split_fragment(s: &str) -> (&str, Option<&str>) {
    match s.split_once('#') {
        Some((path, fragment)) => (path, Some(fragment)),
        None => (s, None),
    }
}
