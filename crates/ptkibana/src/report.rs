use crate::Result;
use serde::Serialize;
use serde_json::{Map, Value};
use std::io::{self, Write};

// region:        --- Models

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Title,
    Info,
    Ok,
    Error,
    /// Extra detail, printed without a bullet.
    Additions,
}

impl Severity {
    fn bullet(&self) -> &'static str {
        match self {
            Severity::Title | Severity::Additions => "",
            Severity::Info => "[*] ",
            Severity::Ok => "[✓] ",
            Severity::Error => "[✗] ",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub node_type: String,
    pub properties: Map<String, Value>,
}

impl Node {
    pub fn new(node_type: &str, properties: impl IntoIterator<Item = (String, Value)>) -> Self {
        Self {
            node_type: node_type.to_string(),
            properties: properties.into_iter().collect(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Running,
    Finished,
    Error,
}

#[derive(Debug, Serialize)]
struct Results<'a> {
    nodes: &'a [Node],
    properties: Map<String, Value>,
    vulnerabilities: Vec<Value>,
}

#[derive(Debug, Serialize)]
struct ResultJson<'a> {
    status: Status,
    message: &'a str,
    results: Results<'a>,
}

// endregion:     --- Models

/// Where checks put their findings and their human readable lines.
pub trait ReportSink: Send {
    fn add_node(&mut self, node: Node);

    /// Lines with `visible == false` are dropped.
    fn print_line(&mut self, text: &str, severity: Severity, indent: usize, visible: bool)
        -> Result<()>;
}

// region:        --- Report

pub struct Report<W: Write = io::Stdout> {
    nodes: Vec<Node>,
    status: Status,
    message: String,
    out: W,
}

impl Report {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> Report<W> {
    pub fn new(out: W) -> Self {
        Self {
            nodes: Vec::new(),
            status: Status::Running,
            message: String::new(),
            out,
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn set_status(&mut self, status: Status, message: impl Into<String>) {
        self.status = status;
        self.message = message.into();
    }

    pub fn result_json(&self) -> Result<String> {
        let result = ResultJson {
            status: self.status,
            message: &self.message,
            results: Results {
                nodes: &self.nodes,
                properties: Map::new(),
                vulnerabilities: Vec::new(),
            },
        };
        Ok(serde_json::to_string(&result)?)
    }

    /// Write the result JSON on its own line.
    pub fn print_json(&mut self) -> Result<()> {
        let json = self.result_json()?;
        writeln!(self.out, "{}", json)?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write + Send> ReportSink for Report<W> {
    fn add_node(&mut self, node: Node) {
        self.nodes.push(node);
    }

    fn print_line(
        &mut self,
        text: &str,
        severity: Severity,
        indent: usize,
        visible: bool,
    ) -> Result<()> {
        if !visible {
            return Ok(());
        }

        if severity == Severity::Title {
            writeln!(self.out)?;
        }
        writeln!(
            self.out,
            "{:indent$}{}{}",
            "",
            severity.bullet(),
            text,
            indent = indent
        )?;
        Ok(())
    }
}

// endregion:     --- Report
