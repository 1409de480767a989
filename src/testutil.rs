//! Test doubles: an in-memory mock DOM behind the `Driver` trait and a
//! memory-backed record sink. The mock models exactly what the pipeline
//! relies on: descendant selector matching, anchors, nested frame
//! documents and a current-context stack.
//!
//! Selector matching is literal: a node "matches" a selector string iff
//! the fixture marked it with that exact string.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::driver::{Driver, DriverError};
use crate::extraction::{AdRecord, RecordSink};

#[derive(Debug, Default)]
struct Node {
    parent: Option<usize>,
    children: Vec<usize>,
    selectors: Vec<String>,
    hrefs: Vec<String>,
    /// For `<iframe>` nodes: the root of the frame's content document.
    frame_doc: Option<usize>,
    displayed: bool,
    size: (f64, f64),
}

/// A fixture DOM. Node 0 is the top-level document root.
#[derive(Debug, Default)]
pub struct MockDom {
    nodes: Vec<Node>,
}

impl MockDom {
    fn new() -> Self {
        let mut dom = MockDom { nodes: Vec::new() };
        dom.push_node(None);
        dom
    }

    fn push_node(&mut self, parent: Option<usize>) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node {
            parent,
            displayed: true,
            size: (100.0, 100.0),
            ..Node::default()
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(id);
        }
        id
    }

    pub fn add_node(&mut self, parent: usize) -> usize {
        self.push_node(Some(parent))
    }

    /// Declare that `node` matches `selector`.
    pub fn mark(&mut self, node: usize, selector: &str) {
        self.nodes[node].selectors.push(selector.to_string());
    }

    /// Attach an anchor with the given href directly to `node`.
    pub fn add_href(&mut self, node: usize, href: &str) {
        self.nodes[node].hrefs.push(href.to_string());
    }

    /// Add an `<iframe>` under `parent`; returns (iframe element, content
    /// document root). The content document is a separate tree, invisible
    /// to queries outside the frame.
    pub fn add_iframe(&mut self, parent: usize) -> (usize, usize) {
        let frame = self.push_node(Some(parent));
        let doc = self.push_node(None);
        self.nodes[frame].frame_doc = Some(doc);
        (frame, doc)
    }

    pub fn set_displayed(&mut self, node: usize, displayed: bool) {
        self.nodes[node].displayed = displayed;
    }

    pub fn set_size(&mut self, node: usize, width: f64, height: f64) {
        self.nodes[node].size = (width, height);
    }

    /// Descendants of `node` in document order, not crossing frame
    /// boundaries and not including `node` itself.
    fn descendants(&self, node: usize) -> Vec<usize> {
        let mut out = Vec::new();
        let mut stack: Vec<usize> = self.nodes[node].children.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            stack.extend(self.nodes[id].children.iter().rev().copied());
        }
        out
    }

    fn matches(&self, node: usize, selector: &str) -> bool {
        self.nodes[node].selectors.iter().any(|s| s == selector)
    }

    fn subtree_hrefs(&self, scope: usize) -> Vec<String> {
        let mut out = self.nodes[scope].hrefs.clone();
        for id in self.descendants(scope) {
            out.extend(self.nodes[id].hrefs.iter().cloned());
        }
        out
    }

    fn subtree_frames(&self, scope: usize) -> Vec<usize> {
        self.descendants(scope)
            .into_iter()
            .filter(|&id| self.nodes[id].frame_doc.is_some())
            .collect()
    }
}

#[derive(Debug, Default)]
struct MockState {
    /// Stack of entered frame content-document roots; empty = top level.
    frame_stack: Vec<usize>,
    scroll_targets: Vec<f64>,
    screenshots: Vec<PathBuf>,
    max_frame_depth: usize,
}

/// Mock `Driver` over a `MockDom`. Elements are node ids.
pub struct MockDriver {
    pub dom: MockDom,
    pub viewport_height: f64,
    pub page_height: f64,
    pub screenshots_fail: bool,
    /// Frames that refuse `enter_frame` (e.g. cross-origin).
    blocked_frames: Vec<usize>,
    state: Mutex<MockState>,
}

impl MockDriver {
    pub const ROOT: usize = 0;

    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        MockDriver {
            dom: MockDom::new(),
            viewport_height: 1000.0,
            page_height: 2000.0,
            screenshots_fail: false,
            blocked_frames: Vec::new(),
            state: Mutex::new(MockState::default()),
        }
    }

    pub fn at_top_level(&self) -> bool {
        self.state.lock().unwrap().frame_stack.is_empty()
    }

    pub fn max_frame_depth(&self) -> usize {
        self.state.lock().unwrap().max_frame_depth
    }

    pub fn scroll_targets(&self) -> Vec<f64> {
        self.state.lock().unwrap().scroll_targets.clone()
    }

    pub fn screenshot_paths(&self) -> Vec<PathBuf> {
        self.state.lock().unwrap().screenshots.clone()
    }

    /// Root of the document the driver is currently switched into.
    fn current_doc(&self) -> usize {
        self.state
            .lock()
            .unwrap()
            .frame_stack
            .last()
            .copied()
            .unwrap_or(Self::ROOT)
    }

    pub fn block_frame(&mut self, frame: usize) {
        self.blocked_frames.push(frame);
    }
}

#[async_trait]
impl Driver for MockDriver {
    type Element = usize;

    async fn viewport_height(&self) -> Result<f64, DriverError> {
        Ok(self.viewport_height)
    }

    async fn scroll_height(&self) -> Result<f64, DriverError> {
        Ok(self.page_height)
    }

    async fn scroll_to(&self, y: f64) -> Result<(), DriverError> {
        self.state.lock().unwrap().scroll_targets.push(y);
        Ok(())
    }

    async fn scroll_into_view(&self, _el: &usize) -> Result<(), DriverError> {
        Ok(())
    }

    async fn ready_state_complete(&self) -> Result<bool, DriverError> {
        Ok(true)
    }

    async fn query(&self, selector: &str) -> Result<Vec<usize>, DriverError> {
        let doc = self.current_doc();
        Ok(self
            .dom
            .descendants(doc)
            .into_iter()
            .filter(|&id| self.dom.matches(id, selector))
            .collect())
    }

    async fn query_within(&self, scope: &usize, selector: &str) -> Result<Vec<usize>, DriverError> {
        Ok(self
            .dom
            .descendants(*scope)
            .into_iter()
            .filter(|&id| self.dom.matches(id, selector))
            .collect())
    }

    async fn parent(&self, el: &usize) -> Result<usize, DriverError> {
        self.dom.nodes[*el]
            .parent
            .ok_or_else(|| DriverError::Other("element has no parent".to_string()))
    }

    async fn is_displayed(&self, el: &usize) -> Result<bool, DriverError> {
        Ok(self.dom.nodes[*el].displayed)
    }

    async fn size(&self, el: &usize) -> Result<(f64, f64), DriverError> {
        Ok(self.dom.nodes[*el].size)
    }

    async fn hrefs_within(&self, scope: &usize) -> Result<Vec<String>, DriverError> {
        Ok(self.dom.subtree_hrefs(*scope))
    }

    async fn hrefs_in_frame(&self) -> Result<Vec<String>, DriverError> {
        Ok(self.dom.subtree_hrefs(self.current_doc()))
    }

    async fn frames_within(&self, scope: &usize) -> Result<Vec<usize>, DriverError> {
        Ok(self.dom.subtree_frames(*scope))
    }

    async fn frames_in_frame(&self) -> Result<Vec<usize>, DriverError> {
        Ok(self.dom.subtree_frames(self.current_doc()))
    }

    async fn enter_frame(&self, frame: &usize) -> Result<(), DriverError> {
        if self.blocked_frames.contains(frame) {
            return Err(DriverError::Script("frame is cross-origin".to_string()));
        }
        let doc = self.dom.nodes[*frame]
            .frame_doc
            .ok_or_else(|| DriverError::Other("element is not a frame".to_string()))?;
        let mut state = self.state.lock().unwrap();
        state.frame_stack.push(doc);
        state.max_frame_depth = state.max_frame_depth.max(state.frame_stack.len());
        Ok(())
    }

    async fn enter_parent_frame(&self) -> Result<(), DriverError> {
        self.state.lock().unwrap().frame_stack.pop();
        Ok(())
    }

    async fn enter_top_frame(&self) -> Result<(), DriverError> {
        self.state.lock().unwrap().frame_stack.clear();
        Ok(())
    }

    async fn screenshot_element(&self, _el: &usize, path: &Path) -> Result<(), DriverError> {
        if self.screenshots_fail {
            return Err(DriverError::Screenshot("target not renderable".to_string()));
        }
        self.state
            .lock()
            .unwrap()
            .screenshots
            .push(path.to_path_buf());
        Ok(())
    }
}

/// Record sink collecting into memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<AdRecord>>,
}

impl MemorySink {
    pub fn records(&self) -> Vec<AdRecord> {
        self.records.lock().unwrap().clone()
    }
}

#[async_trait]
impl RecordSink for MemorySink {
    async fn store(&self, record: &AdRecord) -> anyhow::Result<()> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }
}
