//! Asset inlining module
//!
//! Rewrites the image references of a single page into self-contained
//! `data:` URIs so the host can render the page without resolving archive
//! paths itself. The pass is best effort: references that cannot be matched
//! to an archive entry are left untouched.
//!
//! Rewriting happens in two passes over the markup. A scan pass collects
//! every `img` source, all referenced assets are then resolved and read
//! concurrently, and a second pass substitutes the computed data URIs on
//! the originating elements.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use futures::future::join_all;
use lol_html::{RewriteStrSettings, element, rewrite_str};

use crate::{
    archive::ArchiveAccessor,
    error::FolioError,
    resolver::{extract_file_name, find_by_path_fragment},
    utils::file_extension,
};

/// Inlines every resolvable image reference of a page
///
/// For each `img` element the source URL's file name is matched against the
/// archive with the fuzzy fragment lookup. Matched references are replaced
/// by `data:image/{ext};base64,{payload}` where `ext` is the lowercased text
/// after the final `.` of the resolved entry path; unmatched references stay
/// as they are.
///
/// ## Parameters
/// - `markup`: The page markup as read from the archive
/// - `accessor`: The loaded archive the references resolve against
///
/// ## Return
/// - `Ok(String)`: The inner markup of the page body after substitution
/// - `Err(FolioError)`: A reference was not URL-shaped, or rewriting failed
pub async fn inline_images(
    markup: &str,
    accessor: &dyn ArchiveAccessor,
) -> Result<String, FolioError> {
    let sources = collect_image_sources(markup)?;

    // Independent fan-out per reference; join_all keeps slot order
    let resolutions = join_all(
        sources
            .iter()
            .map(|source| resolve_source(source, accessor)),
    )
    .await;

    let mut substitutions = HashMap::new();
    for (source, resolution) in sources.into_iter().zip(resolutions) {
        if let Some(data_uri) = resolution? {
            substitutions.insert(source, data_uri);
        }
    }

    let rewritten = rewrite_str(
        markup,
        RewriteStrSettings {
            element_content_handlers: vec![element!("img[src]", |el| {
                if let Some(source) = el.get_attribute("src") {
                    if let Some(data_uri) = substitutions.get(&source) {
                        el.set_attribute("src", data_uri)?;
                    }
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )?;

    Ok(body_inner(&rewritten).to_string())
}

/// Collects the `src` attribute of every `img` element, in document order
fn collect_image_sources(markup: &str) -> Result<Vec<String>, FolioError> {
    let sources = Rc::new(RefCell::new(Vec::new()));
    let collected = sources.clone();

    rewrite_str(
        markup,
        RewriteStrSettings {
            element_content_handlers: vec![element!("img[src]", move |el| {
                if let Some(source) = el.get_attribute("src") {
                    collected.borrow_mut().push(source);
                }
                Ok(())
            })],
            ..RewriteStrSettings::default()
        },
    )?;

    Ok(Rc::into_inner(sources)
        .map(RefCell::into_inner)
        .unwrap_or_default())
}

/// Resolves one image reference to its data URI
///
/// A malformed URL is an error; a reference that matches no archive entry is
/// not and resolves to `None`.
async fn resolve_source(
    source: &str,
    accessor: &dyn ArchiveAccessor,
) -> Result<Option<String>, FolioError> {
    let file_name = extract_file_name(source)?;

    let Some(entry) = find_by_path_fragment(accessor.entries(), &file_name) else {
        log::debug!("Image reference \"{}\" matches no archive entry", source);
        return Ok(None);
    };

    let payload = accessor.read_base64(&entry.path).await?;
    let extension = file_extension(&entry.path).unwrap_or_default();

    Ok(Some(format!("data:image/{};base64,{}", extension, payload)))
}

/// Returns the inner markup of the body element
///
/// Pages without a body element are returned whole; the caller gets usable
/// markup either way.
fn body_inner(markup: &str) -> &str {
    let lowered = markup.to_ascii_lowercase();

    let Some(open) = lowered.find("<body") else {
        return markup;
    };
    let Some(open_end) = lowered[open..].find('>') else {
        return markup;
    };
    let start = open + open_end + 1;

    match lowered[start..].rfind("</body") {
        Some(close) => &markup[start..start + close],
        None => &markup[start..],
    }
}
