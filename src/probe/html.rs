use scraper::{Html, Node};

const HIDDEN_ELEMENTS: [&str; 2] = ["script", "style"];

/// Visible text of an HTML document: every text node outside `<script>` and
/// `<style>`, whitespace collapsed to single spaces.
pub fn visible_text(body: &str) -> String {
    let document = Html::parse_document(body);
    let mut words = Vec::new();

    for node in document.tree.root().descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };

        let hidden = node.ancestors().any(|ancestor| {
            matches!(ancestor.value(), Node::Element(element) if HIDDEN_ELEMENTS.contains(&element.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }

    words.join(" ")
}
