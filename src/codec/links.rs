use pulldown_cmark::{
    Event as MdEvent, LinkType, Options, Parser as MdParser, Tag as MdTag, TagEnd as MdTagEnd,
};
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// One inline `[display_text](target)` link found in a document body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub display_text: String,
    pub target: String,
    /// Byte range of the whole link syntax within the body it was parsed from.
    pub span: Range<usize>,
}

/// Gathers the text events between a link's start and end tags.
struct LinkAccumulator {
    target: String,
    span: Range<usize>,
    text: String,
}

impl LinkAccumulator {
    fn new(event: &MdEvent<'_>, offset: &Range<usize>) -> Option<LinkAccumulator> {
        match event {
            MdEvent::Start(MdTag::Link {
                link_type: LinkType::Inline,
                dest_url,
                ..
            }) => Some(LinkAccumulator {
                target: dest_url.to_string(),
                span: offset.clone(),
                text: String::new(),
            }),
            _ => None,
        }
    }

    // Returns true once the link's end tag has been seen
    fn push(&mut self, event: &MdEvent<'_>) -> bool {
        match event {
            MdEvent::Text(text) | MdEvent::Code(text) => self.text.push_str(text),
            MdEvent::SoftBreak | MdEvent::HardBreak => self.text.push(' '),
            MdEvent::End(MdTagEnd::Link) => return true,
            _ => {}
        }
        false
    }

    fn finish(self) -> LinkRecord {
        LinkRecord {
            display_text: self.text,
            target: self.target,
            span: self.span,
        }
    }
}

/// Every inline link in `body`, in document order. Image links, reference-style links, autolinks
/// and anything inside code are not reported.
///
/// Targets follow CommonMark rather than the raw source text: backslash escapes and entities are
/// decoded, and a target containing spaces is only a link when wrapped in angle brackets
/// (`[x](<my notes.md>)` yields `my notes.md`; `[x](my notes.md)` is plain text). `span` always
/// covers the source text as written.
pub fn parse_links(body: &str) -> Vec<LinkRecord> {
    let mut links = Vec::new();
    let mut collector: Option<LinkAccumulator> = None;
    for (event, offset) in MdParser::new_ext(body, Options::empty()).into_offset_iter() {
        if collector.is_none() {
            collector = LinkAccumulator::new(&event, &offset);
            if collector.is_some() {
                continue;
            }
        }
        let done = match collector.as_mut() {
            Some(link) => link.push(&event),
            None => false,
        };
        if done {
            if let Some(link) = collector.take() {
                links.push(link.finish());
            }
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_log::test;

    fn targets(body: &str) -> Vec<String> {
        parse_links(body).into_iter().map(|l| l.target).collect()
    }

    #[test]
    fn test_inline_links_in_order() {
        let body = "See [the setup](./setup.md) then [API](api/index.md#auth).\n\n- [x](https://example.com)\n";
        let links = parse_links(body);
        assert_eq!(links.len(), 3);

        assert_eq!(links[0].display_text, "the setup");
        assert_eq!(links[0].target, "./setup.md");
        assert_eq!(&body[links[0].span.clone()], "[the setup](./setup.md)");

        assert_eq!(links[1].display_text, "API");
        assert_eq!(links[1].target, "api/index.md#auth");
        assert_eq!(&body[links[1].span.clone()], "[API](api/index.md#auth)");

        assert_eq!(links[2].target, "https://example.com");
    }

    #[test]
    fn test_images_are_excluded() {
        let body = "![diagram](./diagram.png) and [doc](./doc.md)\n";
        assert_eq!(targets(body), vec!["./doc.md"]);
    }

    #[test]
    fn test_code_is_not_scanned() {
        let body = "Inline `[no](./no.md)` here.\n\n```\n[also no](./no.md)\n```\n\n[yes](./yes.md)\n";
        assert_eq!(targets(body), vec!["./yes.md"]);
    }

    #[test]
    fn test_formatted_display_text() {
        let body = "[**bold** and `code`](./a.md)\n";
        let links = parse_links(body);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].display_text, "bold and code");
    }

    #[test]
    fn test_reference_links_are_skipped() {
        let body = "[ref][r] and <https://auto.example>\n\n[r]: ./ref.md\n";
        assert!(parse_links(body).is_empty());
    }

    #[test]
    fn test_empty_body() {
        assert!(parse_links("").is_empty());
        assert!(parse_links("no links at all\n").is_empty());
    }

    #[test]
    fn test_targets_follow_commonmark_destinations() {
        let body = "[bare](my notes.md) [wrapped](<my notes.md>) [escaped](a\\_b.md)\n";
        let links = parse_links(body);
        assert_eq!(links.len(), 2);

        assert_eq!(links[0].target, "my notes.md");
        assert_eq!(&body[links[0].span.clone()], "[wrapped](<my notes.md>)");

        assert_eq!(links[1].target, "a_b.md");
        assert_eq!(&body[links[1].span.clone()], "[escaped](a\\_b.md)");
    }
}
