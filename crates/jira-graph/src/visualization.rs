//! Rendering of graph elements.
//!
//! HTML is the primary format: a standalone page that loads cytoscape from a
//! CDN and lays the graph out with `cose`. DOT (Graphviz) and Mermaid exports
//! are provided for embedding in docs or further processing.

use crate::graph::GraphElements;

const CYTOSCAPE_SCRIPT: &str = "<script src=\"https://cdnjs.cloudflare.com/ajax/libs/cytoscape/3.2.22/cytoscape.min.js\" \
integrity=\"sha256-Bqs25OhKdh8ooPMp5xt7cUlfLylUhYzSG6OIAD0DJzM=\" crossorigin=\"anonymous\"></script>";

const PAGE_STYLE: &str = r#"body {
  font: 14px helvetica neue, helvetica, arial, sans-serif;
  background: black;
}

#cy {
  height: 100%;
  width: 100%;
  position: absolute;
  left: 0;
  top: 0;
}
"#;

const GRAPH_SCRIPT: &str = r#"var cy = cytoscape({
  container: document.getElementById('cy'),
  elements: elements,
  boxSelectionEnabled: false,
  autounselectify: true,
  style: cytoscape.stylesheet()
    .selector('node')
      .css({
        'content': 'data(name)',
        'text-valign': 'center',
        'color': 'white',
        'text-outline-width': 1,
        'background-color': 'grey'
      })
    .selector('node[icon != ""]')
      .css({
        'background-image': 'data(icon)',
        'background-fit': 'cover'
      })
    .selector('edge')
      .css({
        'curve-style': 'bezier',
        'target-arrow-shape': 'triangle',
        'line-color': '#888',
        'target-arrow-color': '#888'
      }),
  layout: {
    name: 'cose'
  }
}).on('tap', 'node', function(){
  try {
    window.open(this.data('href'));
  } catch (e) {
    window.location.href = this.data('href');
  }
});
"#;

/// Export as a standalone interactive HTML page.
///
/// # Example
/// ```
/// use jira_graph::graph::{GraphElements, NodeData};
/// use jira_graph::visualization;
///
/// let mut elements = GraphElements::default();
/// elements.add_node(NodeData {
///     id: "1".into(),
///     icon: String::new(),
///     summary: "Setup".into(),
///     name: "P-1".into(),
///     href: "https://tracker/browse/P-1".into(),
/// });
///
/// let html = visualization::export_html(&elements, "Sprint").unwrap();
/// assert!(html.contains("<title>Sprint</title>"));
/// ```
pub fn export_html(elements: &GraphElements, title: &str) -> Result<String, serde_json::Error> {
    // "</" inside a string literal would close the script element early.
    let data = serde_json::to_string_pretty(elements)?.replace("</", "<\\/");

    let mut output = String::from("<!DOCTYPE html>\n<html>\n<head>\n");
    output.push_str("<meta charset=utf-8 />\n");
    output.push_str(&format!("<title>{}</title>\n", escape_html(title)));
    output.push_str(&format!("<style>\n{}</style>\n", PAGE_STYLE));
    output.push_str("</head>\n<body>\n");
    output.push_str("<div id=\"cy\"></div>\n");
    output.push_str(CYTOSCAPE_SCRIPT);
    output.push('\n');
    output.push_str("<script>\n");
    output.push_str(&format!("var elements = {};\n\n", data));
    output.push_str(GRAPH_SCRIPT);
    output.push_str("</script>\n</body>\n</html>\n");
    Ok(output)
}

/// Export as DOT format for Graphviz.
///
/// Nodes are labelled with key and summary and link to the tracker.
pub fn export_dot(elements: &GraphElements) -> String {
    let mut output = String::from("digraph issues {\n");
    output.push_str("  rankdir=LR;\n");
    output.push_str("  node [shape=box, style=rounded];\n\n");

    for node in &elements.nodes {
        let data = &node.data;
        let label = format!("{}\\n{}", escape_dot(&data.name), escape_dot(&data.summary));
        output.push_str(&format!(
            "  \"{}\" [label=\"{}\", URL=\"{}\"];\n",
            escape_dot(&data.id),
            label,
            escape_dot(&data.href)
        ));
    }

    output.push('\n');

    for edge in &elements.edges {
        output.push_str(&format!(
            "  \"{}\" -> \"{}\";\n",
            escape_dot(&edge.data.source),
            escape_dot(&edge.data.target)
        ));
    }

    output.push_str("}\n");
    output
}

/// Export as a Mermaid flowchart with clickable nodes.
pub fn export_mermaid(elements: &GraphElements) -> String {
    let mut output = String::from("graph LR\n");

    for node in &elements.nodes {
        let data = &node.data;
        output.push_str(&format!(
            "  {}[\"{}:<br/>{}\"]\n",
            mermaid_id(&data.id),
            escape_mermaid(&data.name),
            escape_mermaid(&data.summary)
        ));
    }

    output.push('\n');

    for edge in &elements.edges {
        output.push_str(&format!(
            "  {} --> {}\n",
            mermaid_id(&edge.data.source),
            mermaid_id(&edge.data.target)
        ));
    }

    output.push('\n');

    for node in &elements.nodes {
        output.push_str(&format!(
            "  click {} href \"{}\" _blank\n",
            mermaid_id(&node.data.id),
            escape_mermaid(&node.data.href)
        ));
    }

    output
}

fn escape_html(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

fn escape_dot(text: &str) -> String {
    text.replace('\\', "\\\\").replace('"', "\\\"")
}

fn escape_mermaid(text: &str) -> String {
    text.replace('"', "#quot;")
}

// Mermaid ids must be plain identifiers; tracker ids are numeric.
fn mermaid_id(id: &str) -> String {
    let sanitized: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    format!("n{}", sanitized)
}
