use serde::{Serialize, Deserialize, de::DeserializeOwned};
use tracing::{debug, trace, instrument};

// =============== JSON structure discovery ===============

/// Type of a JSON node found by the scanners.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum NodeType {
    Object,
    Array,
}

impl NodeType {
    fn closer(self) -> char {
        match self {
            NodeType::Object => '}',
            NodeType::Array => ']',
        }
    }
}

/// Coordinates of a JSON structure within a larger text, including nested children.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjCoords {
    pub start: usize,
    pub end: usize, // inclusive index of the closing bracket/brace
    pub kind: NodeType,
    pub children: Vec<ObjCoords>,
}

impl ObjCoords {
    pub fn new(start: usize, end: usize, kind: NodeType, children: Vec<ObjCoords>) -> Self {
        Self { start, end, kind, children }
    }

    /// The exact text of this structure within `text`.
    pub fn slice<'a>(&self, text: &'a str) -> &'a str {
        &text[self.start..self.end + 1]
    }
}

#[derive(Debug)]
struct Frame {
    start: usize,
    kind: NodeType,
    children: Vec<ObjCoords>,
}

/// Find all JSON object/array structures in the given text. Coordinates are byte indices.
#[instrument(target = "pdf_quiz::json_stream", skip(text))]
pub fn find_json_structures(text: &str) -> Vec<ObjCoords> {
    let mut results: Vec<ObjCoords> = Vec::new();
    let mut stack: Vec<Frame> = Vec::new();

    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in text.as_bytes().iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match b {
                b'\\' => escape = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match b {
            b'"' => in_string = true,
            b'{' => stack.push(Frame { start: i, kind: NodeType::Object, children: Vec::new() }),
            b'[' => stack.push(Frame { start: i, kind: NodeType::Array, children: Vec::new() }),
            b'}' | b']' => {
                let kind = if b == b'}' { NodeType::Object } else { NodeType::Array };
                if let Some(frame) = stack.pop() {
                    // Unbalanced closers are dropped
                    if frame.kind == kind {
                        let node = ObjCoords::new(frame.start, i, kind, frame.children);
                        if let Some(parent) = stack.last_mut() {
                            parent.children.push(node);
                        } else {
                            results.push(node);
                        }
                    }
                }
            }
            _ => {}
        }
    }

    debug!(target: "pdf_quiz::json_stream", count = results.len(), "found root structures");
    results
}

/// Extract all occurrences of `T` from a response string.
///
/// A top-level `Vec<T>` is preferred; otherwise every structure is tried as
/// `Vec<T>`, then as `T`, descending into children when neither matches.
#[instrument(target = "pdf_quiz::json_stream", skip(text))]
pub fn extract_all<T: DeserializeOwned>(text: &str) -> Vec<T> {
    if let Ok(v) = serde_json::from_str::<Vec<T>>(text) {
        return v;
    }

    fn collect_from_node<T: DeserializeOwned>(text: &str, node: &ObjCoords, out: &mut Vec<T>) {
        let s = node.slice(text);
        if let Ok(vs) = serde_json::from_str::<Vec<T>>(s) {
            out.extend(vs);
            return;
        }
        if let Ok(v) = serde_json::from_str::<T>(s) {
            out.push(v);
            return;
        }
        for child in &node.children {
            collect_from_node::<T>(text, child, out);
        }
    }

    let mut out: Vec<T> = Vec::new();
    for node in &find_json_structures(text) {
        collect_from_node::<T>(text, node, &mut out);
    }
    out
}

// =============== Incremental array scanning ===============

/// Structural events of the first top-level JSON array in a stream.
#[derive(Debug, Clone)]
pub enum ArrayEvent {
    /// The array's opening bracket, at this absolute byte offset.
    Opened(usize),
    /// A direct child of the array closed.
    Element(ObjCoords),
    /// The array's closing bracket, at this absolute byte offset.
    Closed(usize),
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
enum ScanPhase {
    #[default]
    Seeking,
    /// Saw `[` at this offset; committed only if `{` or `]` follows.
    Candidate(usize),
    InArray,
    Done,
}

/// Stateful scanner that can be fed chunks of model output and reports the
/// elements of the first top-level array as they close.
///
/// Text before the array (prose, code fences) is skipped without string
/// tracking. A `[` only starts the array when the next non-whitespace byte
/// is `{` or `]`, so bracketed prose such as `[3 questions]` is skipped too.
/// Everything after the array closes is ignored.
#[derive(Debug, Default)]
pub struct ArrayScanner {
    stack: Vec<Frame>,
    in_string: bool,
    escape: bool,
    phase: ScanPhase,
    /// Absolute offset (bytes) from the beginning of the stream to the start of the next chunk
    offset: usize,
}

impl ArrayScanner {
    pub fn new() -> Self { Self::default() }

    /// Feed a new chunk. Returns the events completed within this chunk, in order.
    #[instrument(target = "pdf_quiz::json_stream", skip(self, chunk), fields(chunk_len = chunk.len(), offset = self.offset))]
    pub fn feed(&mut self, chunk: &str) -> Vec<ArrayEvent> {
        let mut events = Vec::new();

        for (i, &b) in chunk.as_bytes().iter().enumerate() {
            let idx = self.offset + i;

            match self.phase {
                ScanPhase::Done => break,
                ScanPhase::Seeking => {
                    if b == b'[' {
                        self.phase = ScanPhase::Candidate(idx);
                    }
                    continue;
                }
                ScanPhase::Candidate(start) => match b {
                    b' ' | b'\t' | b'\r' | b'\n' => continue,
                    b'{' => {
                        self.stack.push(Frame { start, kind: NodeType::Array, children: Vec::new() });
                        self.phase = ScanPhase::InArray;
                        events.push(ArrayEvent::Opened(start));
                    }
                    b']' => {
                        events.push(ArrayEvent::Opened(start));
                        events.push(ArrayEvent::Closed(idx));
                        self.phase = ScanPhase::Done;
                        continue;
                    }
                    _ => {
                        trace!(target: "pdf_quiz::json_stream", at = start, "bracket is not a question array");
                        self.phase = if b == b'[' { ScanPhase::Candidate(idx) } else { ScanPhase::Seeking };
                        continue;
                    }
                },
                ScanPhase::InArray => {}
            }

            if self.in_string {
                if self.escape {
                    self.escape = false;
                    continue;
                }
                match b {
                    b'\\' => self.escape = true,
                    b'"' => self.in_string = false,
                    _ => {}
                }
                continue;
            }

            match b {
                b'"' => self.in_string = true,
                b'{' => self.stack.push(Frame { start: idx, kind: NodeType::Object, children: Vec::new() }),
                b'[' => self.stack.push(Frame { start: idx, kind: NodeType::Array, children: Vec::new() }),
                b'}' | b']' => {
                    let kind = if b == b'}' { NodeType::Object } else { NodeType::Array };
                    if self.stack.last().map(|f| f.kind) != Some(kind) {
                        trace!(target: "pdf_quiz::json_stream", at = idx, "ignoring unbalanced closer");
                        continue;
                    }
                    if let Some(frame) = self.stack.pop() {
                        let node = ObjCoords::new(frame.start, idx, kind, frame.children);
                        match self.stack.len() {
                            0 => {
                                events.push(ArrayEvent::Closed(idx));
                                self.phase = ScanPhase::Done;
                            }
                            1 => {
                                events.push(ArrayEvent::Element(node.clone()));
                                self.stack[0].children.push(node);
                            }
                            _ => {
                                if let Some(parent) = self.stack.last_mut() {
                                    parent.children.push(node);
                                }
                            }
                        }
                    }
                }
                _ => {}
            }
        }

        self.offset += chunk.len();
        trace!(target: "pdf_quiz::json_stream", events = events.len(), new_offset = self.offset, "feed complete");
        events
    }

    pub fn is_open(&self) -> bool {
        self.phase == ScanPhase::InArray
    }

    pub fn is_closed(&self) -> bool {
        self.phase == ScanPhase::Done
    }

    /// Start offset of the element currently being written, if any.
    pub fn open_element_start(&self) -> Option<usize> {
        if self.phase != ScanPhase::InArray {
            return None;
        }
        self.stack.get(1).map(|frame| frame.start)
    }
}

// =============== Partial JSON repair ===============

/// Close every open string and container of a truncated JSON fragment.
fn close_fragment(fragment: &str) -> String {
    let mut closers: Vec<NodeType> = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for &b in fragment.as_bytes() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match b {
                b'\\' => escape = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' => closers.push(NodeType::Object),
            b'[' => closers.push(NodeType::Array),
            b'}' | b']' => { closers.pop(); }
            _ => {}
        }
    }

    let mut out = fragment.to_string();
    if escape {
        out.pop();
    }
    if in_string {
        out.push('"');
    }
    for kind in closers.iter().rev() {
        out.push(kind.closer());
    }
    out
}

/// Offsets at which a fragment can be cut and still be closed into valid JSON:
/// just before a structural comma, or just after an opening bracket.
fn cut_points(fragment: &str) -> Vec<usize> {
    let mut points = Vec::new();
    let mut in_string = false;
    let mut escape = false;

    for (i, &b) in fragment.as_bytes().iter().enumerate() {
        if in_string {
            if escape {
                escape = false;
                continue;
            }
            match b {
                b'\\' => escape = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b',' => points.push(i),
            b'{' | b'[' => points.push(i + 1),
            _ => {}
        }
    }
    points
}

/// Best-effort parse of a JSON value that may be cut off mid-stream.
///
/// Open strings and containers are closed; if that is not enough (a dangling
/// key, a half-written literal) the fragment is trimmed back to the previous
/// cut point and retried. Returns `None` when nothing parses.
pub fn parse_partial<T: DeserializeOwned>(fragment: &str) -> Option<T> {
    let points = cut_points(fragment);
    let candidates = std::iter::once(fragment.len()).chain(points.into_iter().rev());

    let mut last = usize::MAX;
    for end in candidates {
        if end >= last {
            continue;
        }
        last = end;
        let repaired = close_fragment(&fragment[..end]);
        if let Ok(value) = serde_json::from_str::<T>(&repaired) {
            return Some(value);
        }
    }
    None
}

/// One element of a partially received array.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialElement<T> {
    pub value: T,
    /// Whether the element's closing brace has been received.
    pub closed: bool,
}

/// Snapshot of a JSON array that is still being received.
#[derive(Debug, Clone, PartialEq)]
pub struct PartialArray<T> {
    pub elements: Vec<PartialElement<T>>,
    /// Whether the array's closing bracket has been received.
    pub closed: bool,
}

impl<T> Default for PartialArray<T> {
    fn default() -> Self {
        Self { elements: Vec::new(), closed: false }
    }
}

/// Parse the first top-level array of `text`, which may be truncated anywhere.
///
/// Closed elements that do not deserialize fall back to `T::default()`; the
/// trailing open element is repaired with [`parse_partial`].
pub fn parse_partial_array<T: DeserializeOwned + Default>(text: &str) -> PartialArray<T> {
    let mut scanner = ArrayScanner::new();
    let mut array = PartialArray::default();

    for event in scanner.feed(text) {
        match event {
            ArrayEvent::Element(node) => {
                let value = serde_json::from_str::<T>(node.slice(text)).unwrap_or_default();
                array.elements.push(PartialElement { value, closed: true });
            }
            ArrayEvent::Closed(_) => array.closed = true,
            ArrayEvent::Opened(_) => {}
        }
    }

    if let Some(start) = scanner.open_element_start() {
        let value = parse_partial::<T>(&text[start..]).unwrap_or_default();
        array.elements.push(PartialElement { value, closed: false });
    }

    array
}
