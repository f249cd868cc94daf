//! In-memory page driver over static HTML, for tests.
//!
//! Each routed URL holds one or more render stages; scrolling advances the
//! stage so a feed can "grow" the way a lazy-loading page does. Elements can
//! carry `data-fixture-fault` to make reads or clicks fail:
//! `read` (text read fails), `click` (click fails), `type` (typing fails),
//! `session` (any access
//! closes the session; every later call fails fatally).

use async_trait::async_trait;
use ego_tree::NodeId;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use super::{DriverError, PageDriver};

const FAULT_ATTR: &str = "data-fixture-fault";

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureNode {
    url: String,
    stage: usize,
    id: NodeId,
}

struct Route {
    stages: Vec<String>,
    advance_every: usize,
    stalled: bool,
}

#[derive(Default)]
struct State {
    url: Option<String>,
    stage: usize,
    scrolls: usize,
    closed: bool,
    navigations: Vec<String>,
    clicks: Vec<String>,
    typed: Vec<String>,
    pdfs: Vec<PathBuf>,
}

#[derive(Default)]
pub struct FixturePage {
    routes: HashMap<String, Route>,
    state: Mutex<State>,
}

impl FixturePage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `html` at `url`.
    pub fn route(self, url: &str, html: &str) -> Self {
        self.route_stages(url, vec![html.to_string()], 1)
    }

    /// Serve `stages` at `url`, moving to the next stage every
    /// `advance_every` scrolls and staying on the last one.
    pub fn route_stages(mut self, url: &str, stages: Vec<String>, advance_every: usize) -> Self {
        self.routes.insert(
            url.to_string(),
            Route {
                stages,
                advance_every: advance_every.max(1),
                stalled: false,
            },
        );
        self
    }

    /// Navigation to `url` never completes.
    pub fn stall(mut self, url: &str) -> Self {
        self.routes.insert(
            url.to_string(),
            Route {
                stages: vec![String::new()],
                advance_every: 1,
                stalled: true,
            },
        );
        self
    }

    pub fn navigations(&self) -> Vec<String> {
        self.state.lock().unwrap().navigations.clone()
    }

    pub fn clicks(&self) -> Vec<String> {
        self.state.lock().unwrap().clicks.clone()
    }

    pub fn typed(&self) -> Vec<String> {
        self.state.lock().unwrap().typed.clone()
    }

    pub fn scrolls(&self) -> usize {
        self.state.lock().unwrap().scrolls
    }

    pub fn pdfs(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().pdfs.clone()
    }

    fn current(&self) -> Result<(String, usize), DriverError> {
        let state = self.state.lock().unwrap();
        if state.closed {
            return Err(DriverError::SessionClosed("fixture session closed".into()));
        }
        let url = state
            .url
            .clone()
            .ok_or_else(|| DriverError::Missing("no page loaded".into()))?;
        Ok((url, state.stage))
    }

    fn ensure_open(&self) -> Result<(), DriverError> {
        if self.state.lock().unwrap().closed {
            return Err(DriverError::SessionClosed("fixture session closed".into()));
        }
        Ok(())
    }

    fn close(&self) -> DriverError {
        self.state.lock().unwrap().closed = true;
        DriverError::SessionClosed("fixture fault".into())
    }

    /// Parse the document at `(url, stage)` and run `f` against it.
    fn with_doc<R>(&self, url: &str, stage: usize, f: impl FnOnce(&Html) -> R) -> Result<R, DriverError> {
        let route = self
            .routes
            .get(url)
            .ok_or_else(|| DriverError::Missing(format!("no route for {}", url)))?;
        let html = route
            .stages
            .get(stage)
            .ok_or_else(|| DriverError::Missing(format!("no stage {} for {}", stage, url)))?;
        let doc = Html::parse_document(html);
        Ok(f(&doc))
    }

    /// Run `f` on the element behind `node`, after honouring its fault marker.
    fn with_element<R>(
        &self,
        node: &FixtureNode,
        op: &str,
        f: impl FnOnce(ElementRef<'_>) -> R,
    ) -> Result<R, DriverError> {
        self.ensure_open()?;
        let outcome = self.with_doc(&node.url, node.stage, |doc| {
            let el = doc.tree.get(node.id).and_then(ElementRef::wrap)?;
            let fault = el.value().attr(FAULT_ATTR).map(str::to_string);
            Some((fault, f(el)))
        })?;
        let (fault, value) =
            outcome.ok_or_else(|| DriverError::Missing(format!("stale node for {}", op)))?;
        match fault.as_deref() {
            Some("session") => Err(self.close()),
            Some(kind) if kind == op => Err(DriverError::Script(format!("fixture {} fault", op))),
            _ => Ok(value),
        }
    }
}

fn parse_selector(selector: &str) -> Result<Selector, DriverError> {
    Selector::parse(selector)
        .map_err(|e| DriverError::Script(format!("bad selector {:?}: {:?}", selector, e)))
}

#[async_trait]
impl PageDriver for FixturePage {
    type Node = FixtureNode;

    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError> {
        self.ensure_open()?;
        let route = self.routes.get(url).ok_or_else(|| DriverError::Navigation {
            url: url.to_string(),
            reason: "404".into(),
        })?;
        let mut state = self.state.lock().unwrap();
        state.navigations.push(url.to_string());
        if route.stalled {
            return Err(DriverError::NavigationTimeout {
                url: url.to_string(),
                ms: timeout.as_millis() as u64,
            });
        }
        state.url = Some(url.to_string());
        state.stage = 0;
        state.scrolls = 0;
        Ok(())
    }

    async fn wait_for(&self, selector: &str, timeout: Duration) -> Result<(), DriverError> {
        let found = !self.query_all(selector, None).await?.is_empty();
        if found {
            Ok(())
        } else {
            Err(DriverError::MarkerTimeout {
                selector: selector.to_string(),
                ms: timeout.as_millis() as u64,
            })
        }
    }

    async fn query_all(
        &self,
        selector: &str,
        scope: Option<&FixtureNode>,
    ) -> Result<Vec<FixtureNode>, DriverError> {
        let sel = parse_selector(selector)?;
        let (url, stage) = match scope {
            Some(node) => {
                self.ensure_open()?;
                (node.url.clone(), node.stage)
            }
            None => self.current()?,
        };
        let ids = self.with_doc(&url, stage, |doc| match scope {
            Some(node) => doc
                .tree
                .get(node.id)
                .and_then(ElementRef::wrap)
                .map(|el| el.select(&sel).map(|e| e.id()).collect::<Vec<_>>())
                .unwrap_or_default(),
            None => doc.select(&sel).map(|e| e.id()).collect(),
        })?;
        Ok(ids
            .into_iter()
            .map(|id| FixtureNode { url: url.clone(), stage, id })
            .collect())
    }

    async fn text(&self, node: &FixtureNode) -> Result<String, DriverError> {
        self.with_element(node, "read", |el| el.text().collect::<String>())
    }

    async fn attribute(&self, node: &FixtureNode, name: &str) -> Result<Option<String>, DriverError> {
        self.with_element(node, "read", |el| el.value().attr(name).map(str::to_string))
    }

    async fn click(&self, node: &FixtureNode) -> Result<(), DriverError> {
        let label = self.with_element(node, "click", |el| el.text().collect::<String>())?;
        self.state.lock().unwrap().clicks.push(label.trim().to_string());
        Ok(())
    }

    async fn type_text(&self, node: &FixtureNode, text: &str) -> Result<(), DriverError> {
        self.with_element(node, "type", |_| ())?;
        self.state.lock().unwrap().typed.push(text.to_string());
        Ok(())
    }

    async fn scroll_to_bottom(&self) -> Result<(), DriverError> {
        let (url, _) = self.current()?;
        let route = &self.routes[&url];
        let mut state = self.state.lock().unwrap();
        state.scrolls += 1;
        if state.scrolls % route.advance_every == 0 {
            state.stage = (state.stage + 1).min(route.stages.len().saturating_sub(1));
        }
        Ok(())
    }

    async fn title(&self) -> Result<String, DriverError> {
        let (url, stage) = self.current()?;
        let sel = parse_selector("title")?;
        self.with_doc(&url, stage, |doc| {
            doc.select(&sel)
                .next()
                .map(|t| t.text().collect::<String>())
                .unwrap_or_default()
        })
    }

    fn same_node(&self, a: &FixtureNode, b: &FixtureNode) -> bool {
        a == b
    }

    async fn save_pdf(&self, path: &Path) -> Result<(), DriverError> {
        self.current()?;
        self.state.lock().unwrap().pdfs.push(path.to_path_buf());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: &str = r#"<html><head><title>Group</title></head><body>
        <div class="a"><span>one</span><span data-fixture-fault="read">two</span></div>
        <div class="a"><span>three</span></div>
    </body></html>"#;

    #[tokio::test]
    async fn test_scoped_query_stays_inside_scope() {
        let page = FixturePage::new().route("u", PAGE);
        page.navigate("u", Duration::from_secs(1)).await.unwrap();
        let blocks = page.query_all("div.a", None).await.unwrap();
        assert_eq!(blocks.len(), 2);
        let spans = page.query_all("span", Some(&blocks[1])).await.unwrap();
        assert_eq!(spans.len(), 1);
        assert_eq!(page.text(&spans[0]).await.unwrap(), "three");
        assert_eq!(page.title().await.unwrap(), "Group");
    }

    #[tokio::test]
    async fn test_read_fault_is_recoverable() {
        let page = FixturePage::new().route("u", PAGE);
        page.navigate("u", Duration::from_secs(1)).await.unwrap();
        let spans = page.query_all("div.a span", None).await.unwrap();
        let err = page.text(&spans[1]).await.unwrap_err();
        assert!(!err.is_fatal());
        assert_eq!(page.text(&spans[0]).await.unwrap(), "one");
    }
}
