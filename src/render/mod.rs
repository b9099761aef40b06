//! Rendering markdown documents into html pages.
//!
//! - **document**: front-matter splitting and markdown rendering
//! - **template**: placeholder substitution into the html shell
//! - **assets**: style/script references and static support files
//!
//! # Render Pass
//!
//! ```text
//! reload_template() ──► collect_documents() ──► stale? ──► Document::load()
//!        │                                                      │
//!   changed: force all                                    substitute()
//!                                                               │
//!                                                        <stem>.html
//! ```
//!
//! A document that fails to render does not stop the others. It is retried
//! on every pass until it renders, so a forced pass that failed halfway still
//! converges once the error is fixed.
//!
//! Output pages whose source was removed are left in place.

pub mod assets;
pub mod document;
pub mod template;

use crate::{config::PubConfig, debug, log};
use anyhow::{Context, Result};
use document::Document;
use std::{
    collections::{BTreeMap, BTreeSet},
    fs,
    path::{Path, PathBuf},
    time::SystemTime,
};
use template::Template;

/// Html shell used when no `--template` is given.
pub const BUNDLED_TEMPLATE: &str = include_str!("../embed/template/page.html");

/// Outcome of one render pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderReport {
    /// Pages written in this pass, in document order.
    pub rendered: Vec<PathBuf>,
    /// Documents whose page was already up to date.
    pub skipped: usize,
    /// Documents that failed, with the error chain.
    pub failed: Vec<(PathBuf, String)>,
    /// The template was reloaded, forcing a full pass.
    pub template_reloaded: bool,
}

impl RenderReport {
    /// All failure messages, one per line. Empty when nothing failed.
    pub fn failure_summary(&self) -> String {
        self.failed
            .iter()
            .map(|(_, err)| err.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Renders the documents of one content path into an output directory.
///
/// Owns the loaded template and the modification time it was loaded at, so
/// a pass can tell when the template file changed on disk.
pub struct Renderer {
    content: PathBuf,
    output: PathBuf,
    template_path: Option<PathBuf>,
    template: Template,
    template_mtime: Option<SystemTime>,
    params: BTreeMap<String, String>,
    /// Sources whose last render failed; rendered again on every pass.
    pending: BTreeSet<PathBuf>,
    debug: bool,
}

impl Renderer {
    /// Create a renderer writing into `output`.
    pub fn new(config: &PubConfig, output: &Path) -> Result<Self> {
        let (template, template_mtime) = match &config.template {
            Some(path) => (
                Template::load(path)
                    .with_context(|| format!("Failed to read template {}", path.display()))?,
                modified(path),
            ),
            None => (Template::new(BUNDLED_TEMPLATE), None),
        };

        debug!(
            config.debug;
            "template placeholders: {:?}",
            template.placeholders().collect::<Vec<_>>()
        );

        let params = BTreeMap::from([
            ("custom_style".to_owned(), config.style.style_tag()),
            ("custom_script".to_owned(), config.script.script_tag()),
            ("code_style".to_owned(), config.code_style.clone()),
        ]);

        Ok(Self {
            content: config.content.clone(),
            output: output.to_path_buf(),
            template_path: config.template.clone(),
            template,
            template_mtime,
            params,
            pending: BTreeSet::new(),
            debug: config.debug,
        })
    }

    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Reload the template if its file changed since it was loaded.
    ///
    /// Returns `true` when a new template was loaded.
    pub fn reload_template(&mut self) -> Result<bool> {
        let Some(path) = &self.template_path else {
            return Ok(false);
        };

        let mtime = modified(path);
        let advanced = match (mtime, self.template_mtime) {
            (Some(now), Some(loaded)) => now > loaded,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !advanced {
            return Ok(false);
        }

        self.template = Template::load(path)
            .with_context(|| format!("Failed to reload template {}", path.display()))?;
        self.template_mtime = mtime;
        log!("render"; "template changed, rendering all pages");
        Ok(true)
    }

    /// Render every stale or previously failed document, or all of them when
    /// `force` is set or the template changed.
    ///
    /// Per-document failures are collected in [`RenderReport::failed`]; only
    /// listing the content path or reloading the template fails the pass.
    pub fn render_pass(&mut self, force: bool) -> Result<RenderReport> {
        let template_reloaded = self.reload_template()?;
        let force = force || template_reloaded;

        let mut report = RenderReport {
            template_reloaded,
            ..Default::default()
        };

        for source in collect_documents(&self.content)? {
            let page = self.output_path(&source);
            if !force && !self.pending.contains(&source) && is_up_to_date(&source, &page) {
                report.skipped += 1;
                continue;
            }

            match self.write_page(&source, &page) {
                Ok(()) => {
                    debug!(self.debug; "wrote {}", page.display());
                    self.pending.remove(&source);
                    report.rendered.push(page);
                }
                Err(err) => {
                    report.failed.push((source.clone(), format!("{err:#}")));
                    self.pending.insert(source);
                }
            }
        }

        debug!(self.debug; "{} pages up to date", report.skipped);
        Ok(report)
    }

    fn write_page(&self, source: &Path, page: &Path) -> Result<()> {
        let html = self.render_document(source)?;
        fs::write(page, html).with_context(|| format!("Failed to write {}", page.display()))
    }

    /// Render one markdown file into a full html page.
    pub fn render_document(&self, source: &Path) -> Result<String> {
        let document = Document::load(source)?;

        let mut params = self.params.clone();
        params.insert("title".into(), document.stem());
        params.extend(document.metadata.iter().map(|(k, v)| (k.clone(), v.clone())));
        debug!(self.debug; "template parameters for {}: {:?}", source.display(), params);
        params.insert("content".into(), document.to_html());

        self.template
            .substitute(&params)
            .with_context(|| format!("Failed to render {}", source.display()))
    }

    /// Page path for a source document: `<output>/<stem>.html`.
    pub fn output_path(&self, source: &Path) -> PathBuf {
        let stem = source.file_stem().unwrap_or(source.as_os_str());
        let mut name = stem.to_os_string();
        name.push(".html");
        self.output.join(name)
    }
}

/// Markdown files to render.
///
/// A file path yields itself; a directory yields its `*.md` files, not
/// descending into subdirectories, sorted by name.
pub fn collect_documents(content: &Path) -> Result<Vec<PathBuf>> {
    if content.is_file() {
        return Ok(vec![content.to_path_buf()]);
    }

    let mut documents: Vec<_> = fs::read_dir(content)
        .with_context(|| format!("Failed to read directory {}", content.display()))?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.is_file() && path.extension().is_some_and(|ext| ext == "md"))
        .collect();
    documents.sort();
    Ok(documents)
}

fn modified(path: &Path) -> Option<SystemTime> {
    path.metadata().and_then(|m| m.modified()).ok()
}

/// Check if destination exists and is strictly newer than its source.
///
/// Equal times count as stale: with coarse mtimes a save in the same tick as
/// the last render would otherwise never be picked up.
pub fn is_up_to_date(src: &Path, dst: &Path) -> bool {
    match (modified(src), modified(dst)) {
        (Some(src_time), Some(dst_time)) => src_time < dst_time,
        _ => false,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::assets::StaticRef;
    use std::{fs::File, time::Duration};
    use tempfile::TempDir;

    struct Fixture {
        _dir: TempDir,
        content: PathBuf,
        output: PathBuf,
    }

    fn fixture(files: &[(&str, &str)]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let content = dir.path().join("content");
        let output = dir.path().join("public");
        fs::create_dir_all(&content).unwrap();
        fs::create_dir_all(&output).unwrap();
        for (name, text) in files {
            fs::write(content.join(name), text).unwrap();
        }
        Fixture {
            _dir: dir,
            content,
            output,
        }
    }

    fn config(content: &Path, template: Option<PathBuf>) -> PubConfig {
        PubConfig {
            content: content.to_path_buf(),
            template,
            style: StaticRef::Builtin("cyan"),
            ..Default::default()
        }
    }

    fn set_mtime(path: &Path, time: SystemTime) {
        File::options()
            .write(true)
            .open(path)
            .unwrap()
            .set_modified(time)
            .unwrap();
    }

    fn mtime(path: &Path) -> SystemTime {
        path.metadata().unwrap().modified().unwrap()
    }

    #[test]
    fn test_collect_documents_directory() {
        let fx = fixture(&[("b.md", ""), ("a.md", ""), ("notes.txt", ""), ("c.MD.bak", "")]);
        fs::create_dir(fx.content.join("nested.md")).unwrap();
        fs::write(fx.content.join("nested.md").join("deep.md"), "").unwrap();

        let docs = collect_documents(&fx.content).unwrap();
        let names: Vec<_> = docs
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.md", "b.md"]);
    }

    #[test]
    fn test_collect_documents_single_file() {
        let fx = fixture(&[("only.md", "x"), ("other.md", "y")]);
        let file = fx.content.join("only.md");
        assert_eq!(collect_documents(&file).unwrap(), vec![file]);
    }

    #[test]
    fn test_full_pass_writes_one_page_per_document() {
        let fx = fixture(&[("one.md", "# One"), ("two.md", "# Two"), ("three.md", "# Three")]);
        let mut renderer = Renderer::new(&config(&fx.content, None), &fx.output).unwrap();

        let report = renderer.render_pass(true).unwrap();
        assert_eq!(report.rendered.len(), 3);
        assert_eq!(report.skipped, 0);

        let mut pages: Vec<_> = fs::read_dir(&fx.output)
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        pages.sort();
        assert_eq!(pages, ["one.html", "three.html", "two.html"]);

        let html = fs::read_to_string(fx.output.join("one.html")).unwrap();
        assert!(html.contains("<title>one</title>"));
        assert!(html.contains("One</h1>"));
        assert!(html.contains(r#"<link href="cyan.css" rel="stylesheet">"#));
        assert!(html.contains("styles/github-dark.min.css"));
    }

    #[test]
    fn test_unchanged_sources_are_not_rewritten() {
        let fx = fixture(&[("a.md", "a"), ("b.md", "b")]);
        let mut renderer = Renderer::new(&config(&fx.content, None), &fx.output).unwrap();
        renderer.render_pass(true).unwrap();

        let later = SystemTime::now() + Duration::from_secs(60);
        for page in ["a.html", "b.html"] {
            set_mtime(&fx.output.join(page), later);
        }

        let report = renderer.render_pass(false).unwrap();
        assert!(report.rendered.is_empty());
        assert_eq!(report.skipped, 2);
        assert_eq!(mtime(&fx.output.join("a.html")), later);
        assert_eq!(mtime(&fx.output.join("b.html")), later);
    }

    #[test]
    fn test_touched_source_is_rerendered_alone() {
        let fx = fixture(&[("a.md", "a"), ("b.md", "b")]);
        let mut renderer = Renderer::new(&config(&fx.content, None), &fx.output).unwrap();
        renderer.render_pass(true).unwrap();

        let later = SystemTime::now() + Duration::from_secs(60);
        set_mtime(&fx.output.join("a.html"), later);
        set_mtime(&fx.output.join("b.html"), later);
        fs::write(fx.content.join("b.md"), "changed").unwrap();
        set_mtime(&fx.content.join("b.md"), later + Duration::from_secs(60));

        let report = renderer.render_pass(false).unwrap();
        assert_eq!(report.rendered, vec![fx.output.join("b.html")]);
        assert_eq!(mtime(&fx.output.join("a.html")), later);
        assert!(fs::read_to_string(fx.output.join("b.html")).unwrap().contains("changed"));
    }

    #[test]
    fn test_missing_page_is_rendered() {
        let fx = fixture(&[("a.md", "a"), ("b.md", "b")]);
        let mut renderer = Renderer::new(&config(&fx.content, None), &fx.output).unwrap();
        renderer.render_pass(true).unwrap();

        fs::remove_file(fx.output.join("a.html")).unwrap();
        let later = SystemTime::now() + Duration::from_secs(60);
        set_mtime(&fx.output.join("b.html"), later);

        let report = renderer.render_pass(false).unwrap();
        assert_eq!(report.rendered, vec![fx.output.join("a.html")]);
    }

    #[test]
    fn test_template_change_forces_full_pass() {
        let fx = fixture(&[("a.md", "---\ntitle: Hello\n---\nbody"), ("b.md", "b")]);
        let template = fx.content.join("shell.html");
        fs::write(&template, "<h1>{{title}}</h1>{{content}}").unwrap();

        let mut renderer =
            Renderer::new(&config(&fx.content, Some(template.clone())), &fx.output).unwrap();
        renderer.render_pass(true).unwrap();
        assert!(fs::read_to_string(fx.output.join("a.html")).unwrap().contains("<h1>Hello</h1>"));

        let later = SystemTime::now() + Duration::from_secs(60);
        set_mtime(&fx.output.join("a.html"), later);
        set_mtime(&fx.output.join("b.html"), later);
        fs::write(&template, "<h2>{{title}}</h2>{{content}}").unwrap();
        set_mtime(&template, later + Duration::from_secs(60));

        let report = renderer.render_pass(false).unwrap();
        assert!(report.template_reloaded);
        assert_eq!(report.rendered.len(), 2);
        assert!(fs::read_to_string(fx.output.join("a.html")).unwrap().contains("<h2>Hello</h2>"));

        let report = renderer.render_pass(false).unwrap();
        assert!(!report.template_reloaded);
    }

    #[test]
    fn test_reload_template_without_custom_template() {
        let fx = fixture(&[]);
        let mut renderer = Renderer::new(&config(&fx.content, None), &fx.output).unwrap();
        assert!(!renderer.reload_template().unwrap());
    }

    #[test]
    fn test_metadata_overrides_defaults_but_not_content() {
        let fx = fixture(&[(
            "post.md",
            "---\ncode_style: monokai\ncontent: ignored\n---\nreal body",
        )]);
        let template = fx.content.join("shell.html");
        fs::write(&template, "[{{code_style}}] {{content}}").unwrap();

        let renderer = Renderer::new(&config(&fx.content, Some(template)), &fx.output).unwrap();
        let html = renderer.render_document(&fx.content.join("post.md")).unwrap();
        assert!(html.starts_with("[monokai] "));
        assert!(html.contains("real body"));
        assert!(!html.contains("ignored"));
    }

    #[test]
    fn test_missing_placeholder_fails() {
        let fx = fixture(&[("post.md", "body")]);
        let template = fx.content.join("shell.html");
        fs::write(&template, "{{author}} {{content}}").unwrap();

        let mut renderer =
            Renderer::new(&config(&fx.content, Some(template)), &fx.output).unwrap();
        let report = renderer.render_pass(true).unwrap();
        assert!(report.rendered.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert_eq!(report.failed[0].0, fx.content.join("post.md"));
        assert!(report.failure_summary().contains("author"), "{report:?}");
        assert!(!fx.output.join("post.html").exists());
    }

    #[test]
    fn test_broken_document_does_not_block_others() {
        let fx = fixture(&[("a.md", "---\ntitle: [oops\n---\n"), ("b.md", "first")]);
        let mut renderer = Renderer::new(&config(&fx.content, None), &fx.output).unwrap();

        let report = renderer.render_pass(true).unwrap();
        assert_eq!(report.rendered, vec![fx.output.join("b.html")]);
        assert_eq!(report.failed.len(), 1);
        assert!(report.failure_summary().contains("a.md"));

        let later = SystemTime::now() + Duration::from_secs(60);
        set_mtime(&fx.output.join("b.html"), later);
        fs::write(fx.content.join("b.md"), "edited").unwrap();
        set_mtime(&fx.content.join("b.md"), later + Duration::from_secs(60));

        let report = renderer.render_pass(false).unwrap();
        assert_eq!(report.rendered, vec![fx.output.join("b.html")]);
        assert_eq!(report.failed.len(), 1);
        assert!(fs::read_to_string(fx.output.join("b.html")).unwrap().contains("edited"));
    }

    #[test]
    fn test_failed_forced_pass_still_converges() {
        let fx = fixture(&[
            ("a.md", "no author here"),
            ("b.md", "---\nauthor: Li\n---\nbody"),
        ]);
        let earlier = SystemTime::now() - Duration::from_secs(60);
        set_mtime(&fx.content.join("a.md"), earlier);
        set_mtime(&fx.content.join("b.md"), earlier);
        let template = fx.content.join("shell.html");
        fs::write(&template, "OLD {{content}}").unwrap();

        let mut renderer =
            Renderer::new(&config(&fx.content, Some(template.clone())), &fx.output).unwrap();
        renderer.render_pass(true).unwrap();

        let later = SystemTime::now() + Duration::from_secs(60);
        fs::write(&template, "NEW {{author}} {{content}}").unwrap();
        set_mtime(&template, later);

        let report = renderer.render_pass(false).unwrap();
        assert!(report.template_reloaded);
        assert_eq!(report.rendered, vec![fx.output.join("b.html")]);
        assert_eq!(report.failed.len(), 1);
        assert!(fs::read_to_string(fx.output.join("b.html")).unwrap().starts_with("NEW Li"));

        // Still broken: retried, siblings left alone.
        let report = renderer.render_pass(false).unwrap();
        assert!(report.rendered.is_empty());
        assert_eq!(report.failed.len(), 1);
        assert!(fs::read_to_string(fx.output.join("a.html")).unwrap().starts_with("OLD"));

        // Fixing the metadata alone is enough, no touch of the template needed.
        fs::write(fx.content.join("a.md"), "---\nauthor: Wu\n---\nfixed").unwrap();
        let report = renderer.render_pass(false).unwrap();
        assert_eq!(report.rendered, vec![fx.output.join("a.html")]);
        assert!(report.failed.is_empty());
        assert!(fs::read_to_string(fx.output.join("a.html")).unwrap().starts_with("NEW Wu"));
        assert!(fs::read_to_string(fx.output.join("b.html")).unwrap().starts_with("NEW Li"));
    }

    #[test]
    fn test_orphaned_pages_are_kept() {
        let fx = fixture(&[("a.md", "a"), ("b.md", "b")]);
        let mut renderer = Renderer::new(&config(&fx.content, None), &fx.output).unwrap();
        renderer.render_pass(true).unwrap();

        fs::remove_file(fx.content.join("b.md")).unwrap();
        renderer.render_pass(true).unwrap();
        assert!(fx.output.join("b.html").is_file());
    }

    #[test]
    fn test_is_up_to_date() {
        let fx = fixture(&[("a.md", "a")]);
        let src = fx.content.join("a.md");
        let dst = fx.output.join("a.html");
        assert!(!is_up_to_date(&src, &dst));

        fs::write(&dst, "").unwrap();
        let now = SystemTime::now();
        set_mtime(&src, now);
        set_mtime(&dst, now + Duration::from_secs(1));
        assert!(is_up_to_date(&src, &dst));

        set_mtime(&src, now + Duration::from_secs(5));
        assert!(!is_up_to_date(&src, &dst));
    }

    #[test]
    fn test_equal_mtimes_are_stale() {
        let fx = fixture(&[("a.md", "a")]);
        let src = fx.content.join("a.md");
        let dst = fx.output.join("a.html");
        fs::write(&dst, "").unwrap();

        let now = SystemTime::now();
        set_mtime(&src, now);
        set_mtime(&dst, now);
        assert!(!is_up_to_date(&src, &dst));
    }
}
