// SPDX-License-Identifier: BSD-3-Clause
// Copyright (c) 2026 Aleksandr Ptakhin

//! Pull text, tables and attributes out of fetched pages.
//!
//! Selectors are CSS selectors as understood by the `scraper` crate. Every
//! lookup that finds nothing is an error, which makes these helpers usable
//! directly as validity checks in a re-crawl evaluation.

use scraper::{ElementRef, Html, Selector};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExtractError {
    #[error("invalid selector {selector}: {reason}")]
    InvalidSelector { selector: String, reason: String },
    #[error("could not find any element matching {0}")]
    NotFound(String),
    #[error("attribute {attribute} not found in element matching {selector}")]
    MissingAttribute { selector: String, attribute: String },
}

pub type Result<T> = std::result::Result<T, ExtractError>;

/// Parse a CSS selector once, so it can be reused across many pages
pub fn parse_selector(expression: &str) -> Result<Selector> {
    Selector::parse(expression).map_err(|e| ExtractError::InvalidSelector {
        selector: expression.to_string(),
        reason: e.to_string(),
    })
}

pub fn parse_document(page_source: &str) -> Html {
    Html::parse_document(page_source)
}

/// Serialize a parsed document back to HTML, mostly for debugging
pub fn render_document(document: &Html) -> String {
    document.html()
}

/// Check whether a page contains at least one element matching `selector`
pub fn has_selector(page_source: &str, selector: &Selector) -> bool {
    parse_document(page_source).select(selector).next().is_some()
}

/// All rows matched by `rows_expression`, in document order
pub fn extract_table<'a>(
    document: &'a Html,
    rows_expression: &str,
) -> Result<Vec<ElementRef<'a>>> {
    let rows: Vec<_> = document.select(&parse_selector(rows_expression)?).collect();
    if rows.is_empty() {
        return Err(ExtractError::NotFound(rows_expression.to_string()));
    }
    Ok(rows)
}

/// Text of the first element under `node` matching `expression`, with every
/// occurrence of `dirt` removed and surrounding whitespace trimmed
pub fn extract_text(node: ElementRef<'_>, expression: &str, dirt: &str) -> Result<String> {
    let element = node
        .select(&parse_selector(expression)?)
        .next()
        .ok_or_else(|| ExtractError::NotFound(expression.to_string()))?;

    let text: String = element.text().collect();
    let text = if dirt.is_empty() {
        text
    } else {
        text.replace(dirt, "")
    };
    Ok(text.trim().to_string())
}

/// Every element under `node` matching `expression`
pub fn find_nodes<'a>(node: ElementRef<'a>, expression: &str) -> Result<Vec<ElementRef<'a>>> {
    let nodes: Vec<_> = node.select(&parse_selector(expression)?).collect();
    if nodes.is_empty() {
        return Err(ExtractError::NotFound(expression.to_string()));
    }
    Ok(nodes)
}

/// Value of `attribute` on the first element under `node` matching `expression`
pub fn get_element_attribute(
    node: ElementRef<'_>,
    expression: &str,
    attribute: &str,
) -> Result<String> {
    let element = node
        .select(&parse_selector(expression)?)
        .next()
        .ok_or_else(|| ExtractError::NotFound(expression.to_string()))?;

    element
        .value()
        .attr(attribute)
        .map(str::to_string)
        .ok_or_else(|| ExtractError::MissingAttribute {
            selector: expression.to_string(),
            attribute: attribute.to_string(),
        })
}

/// Title of the page, falling back to the first `<h1>`
pub fn extract_title(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    ["title", "h1"].iter().find_map(|expression| {
        let selector = parse_selector(expression).ok()?;
        let element = document.select(&selector).next()?;
        let text = element.text().collect::<String>();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const CASE_PAGE: &str = r#"
        <html>
            <head><title>Processo 1017927-35.2023.8.26.0008</title></head>
            <body>
                <span id="numeroProcesso">
                    1017927-35.2023.8.26.0008
                </span>
                <span id="classeProcesso">Procedimento Comum Cível</span>
                <table id="tablePartesPrincipais">
                    <tbody>
                        <tr><td class="tipo">Reqte</td><td class="nome">Maria Silva</td></tr>
                        <tr><td class="tipo">Reqdo</td><td class="nome">Banco S.A.</td></tr>
                    </tbody>
                </table>
                <a id="docs" href="/pastadigital/abrir.do?processo=1017927">Autos</a>
            </body>
        </html>
    "#;

    #[test]
    fn test_extract_text_trims_and_removes_dirt() {
        let document = parse_document(CASE_PAGE);
        let root = document.root_element();
        assert_eq!(
            extract_text(root, "#numeroProcesso", "").unwrap(),
            "1017927-35.2023.8.26.0008"
        );
        assert_eq!(
            extract_text(root, "#classeProcesso", " Cível").unwrap(),
            "Procedimento Comum"
        );
    }

    #[test]
    fn test_extract_text_missing_element() {
        let document = parse_document(CASE_PAGE);
        let err = extract_text(document.root_element(), "#juizProcesso", "").unwrap_err();
        assert_eq!(err, ExtractError::NotFound("#juizProcesso".to_string()));
    }

    #[test]
    fn test_extract_table_rows_and_cells() {
        let document = parse_document(CASE_PAGE);
        let rows = extract_table(&document, "#tablePartesPrincipais > tbody > tr").unwrap();
        assert_eq!(rows.len(), 2);

        let names: Vec<_> = rows
            .iter()
            .map(|row| extract_text(*row, "td.nome", "").unwrap())
            .collect();
        assert_eq!(names, vec!["Maria Silva", "Banco S.A."]);
    }

    #[test]
    fn test_extract_table_no_rows() {
        let document = parse_document(CASE_PAGE);
        assert!(matches!(
            extract_table(&document, "#tabelaTodasMovimentacoes tr"),
            Err(ExtractError::NotFound(_))
        ));
    }

    #[test]
    fn test_invalid_selector() {
        let document = parse_document(CASE_PAGE);
        let err = find_nodes(document.root_element(), "td[").unwrap_err();
        assert!(matches!(err, ExtractError::InvalidSelector { .. }));

        let err = parse_selector("td[").unwrap_err();
        assert!(err.to_string().starts_with("invalid selector td["));
    }

    #[test]
    fn test_find_nodes() {
        let document = parse_document(CASE_PAGE);
        let cells = find_nodes(document.root_element(), "td.tipo").unwrap();
        assert_eq!(cells.len(), 2);
    }

    #[test]
    fn test_get_element_attribute() {
        let document = parse_document(CASE_PAGE);
        let root = document.root_element();
        assert_eq!(
            get_element_attribute(root, "#docs", "href").unwrap(),
            "/pastadigital/abrir.do?processo=1017927"
        );
        assert!(matches!(
            get_element_attribute(root, "#docs", "target"),
            Err(ExtractError::MissingAttribute { .. })
        ));
    }

    #[test]
    fn test_has_selector() {
        let selector = parse_selector("#numeroProcesso").unwrap();
        assert!(has_selector(CASE_PAGE, &selector));
        let loading = "<html><body>Carregando...</body></html>";
        assert!(!has_selector(loading, &selector));
    }

    #[test]
    fn test_render_document_round_trips_content() {
        let document = parse_document("<p>Olá <b>mundo</b></p>");
        let rendered = render_document(&document);
        assert!(rendered.contains("<b>mundo</b>"));
    }

    #[test]
    fn test_extract_title_prefers_title_tag() {
        assert_eq!(
            extract_title(CASE_PAGE),
            Some("Processo 1017927-35.2023.8.26.0008".to_string())
        );
    }

    #[test]
    fn test_extract_title_falls_back_to_heading() {
        let html = "<html><head><title> </title></head><body><h1>Consulta de Processos</h1></body></html>";
        assert_eq!(extract_title(html), Some("Consulta de Processos".to_string()));
    }

    #[test]
    fn test_extract_title_missing() {
        assert_eq!(extract_title("<html><body><p>x</p></body></html>"), None);
    }
}
