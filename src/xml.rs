//! PROPFIND request-body parsing and multi-status response framing
//! (SPEC_FULL.md §4.5). Grounded on the original's
//! `ElementTree.iterparse` walk over `{DAV:}allprop`/`{DAV:}propname`/
//! `{DAV:}prop`, and on the teacher's use of `xml-rs` for streaming
//! event-based parsing elsewhere in the crate.

use xml::reader::{EventReader, XmlEvent};
use xml::writer::{EmitterConfig, XmlEvent as WEvent};

use crate::errors::{DavError, DavResult};
use crate::props::PropValue;

/// What a PROPFIND request body asked for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropfindQuery {
    /// Empty body, or an explicit `<allprop/>`: every live property.
    AllProp,
    /// `<propname/>`: property names only, no values.
    PropName,
    /// `<prop>` listing specific Clark-notation names.
    Props(Vec<String>),
}

/// Parses a PROPFIND request body. An empty body means [`PropfindQuery::AllProp`],
/// matching the original's `CONTENT_LENGTH == 0` branch.
pub fn parse_propfind(body: &[u8]) -> DavResult<PropfindQuery> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(PropfindQuery::AllProp);
    }

    let parser = EventReader::new(body);
    let mut depth = 0i32;
    let mut seen: Option<PropfindQuery> = None;
    let mut in_prop = false;
    let mut prop_ns_stack: Vec<String> = Vec::new();

    for event in parser {
        let event = event.map_err(|_| DavError::BadRequest("malformed PROPFIND XML"))?;
        match event {
            XmlEvent::StartElement {
                name, ..
            } => {
                depth += 1;
                let is_dav = name.namespace.as_deref() == Some("DAV:");
                if depth == 2 && is_dav {
                    match name.local_name.as_str() {
                        "allprop" => {
                            if seen.is_some() {
                                return Err(DavError::BadRequest("multiple PROPFIND query elements"));
                            }
                            seen = Some(PropfindQuery::AllProp);
                        }
                        "propname" => {
                            if seen.is_some() {
                                return Err(DavError::BadRequest("multiple PROPFIND query elements"));
                            }
                            seen = Some(PropfindQuery::PropName);
                        }
                        "prop" => {
                            if seen.is_some() {
                                return Err(DavError::BadRequest("multiple PROPFIND query elements"));
                            }
                            seen = Some(PropfindQuery::Props(Vec::new()));
                            in_prop = true;
                        }
                        _ => {}
                    }
                } else if depth == 3 && in_prop {
                    let ns = if name.namespace.as_deref().unwrap_or_default() == "DAV:" {
                        "DAV:".to_string()
                    } else {
                        name.namespace.clone().unwrap_or_default()
                    };
                    prop_ns_stack.push(ns.clone());
                    if let Some(PropfindQuery::Props(names)) = seen.as_mut() {
                        names.push(crate::path::clark_join(&ns, &name.local_name));
                    }
                }
            }
            XmlEvent::EndElement { .. } => {
                depth -= 1;
                if depth == 2 {
                    in_prop = false;
                }
                if depth == 2 && !prop_ns_stack.is_empty() {
                    prop_ns_stack.pop();
                }
            }
            _ => {}
        }
    }

    seen.ok_or(DavError::BadRequest("empty or unrecognized PROPFIND body"))
}

/// One resource's contribution to a multistatus response: its `href`
/// and the per-status groupings of its properties.
pub struct ResponseEntry {
    pub href: String,
    /// status -> (name, value) pairs sharing that status.
    pub found: Vec<(String, Option<PropValue>)>,
    pub names_only: bool,
}

/// Serializes a `{DAV:}multistatus` document per SPEC_FULL.md §4.5:
/// one `{DAV:}response` per resource, with `{DAV:}href` as a sibling of
/// `{DAV:}propstat` (never produced by the property provider itself),
/// and a `{DAV:}propstat` per distinct status among that resource's
/// properties (200 for found, 404 for missing).
pub fn write_multistatus(entries: &[ResponseEntry]) -> String {
    let mut buf = Vec::new();
    {
        let mut w = EmitterConfig::new()
            .perform_indent(false)
            .write_document_declaration(true)
            .create_writer(&mut buf);

        w.write(WEvent::start_element("D:multistatus").default_ns("DAV:").ns("D", "DAV:"))
            .unwrap();

        for entry in entries {
            w.write(WEvent::start_element("D:response")).unwrap();
            w.write(WEvent::start_element("D:href")).unwrap();
            w.write(WEvent::characters(&entry.href)).unwrap();
            w.write(WEvent::end_element()).unwrap();

            let mut found_names = Vec::new();
            let mut missing_names = Vec::new();
            for (name, value) in &entry.found {
                match value {
                    Some(v) => found_names.push((name.clone(), v.clone())),
                    None => missing_names.push(name.clone()),
                }
            }

            if !found_names.is_empty() {
                write_propstat(&mut w, &found_names, entry.names_only, "HTTP/1.1 200 OK");
            }
            if !missing_names.is_empty() {
                let as_missing: Vec<(String, PropValue)> = missing_names
                    .into_iter()
                    .map(|n| (n, PropValue::Text(String::new())))
                    .collect();
                write_propstat(&mut w, &as_missing, true, "HTTP/1.1 404 Not Found");
            }

            w.write(WEvent::end_element()).unwrap();
        }

        w.write(WEvent::end_element()).unwrap();
    }
    String::from_utf8(buf).expect("xml writer only emits valid utf-8")
}

fn write_propstat<W: std::io::Write>(
    w: &mut xml::writer::EventWriter<W>,
    names: &[(String, PropValue)],
    names_only: bool,
    status: &str,
) {
    w.write(WEvent::start_element("D:propstat")).unwrap();
    w.write(WEvent::start_element("D:prop")).unwrap();
    for (name, value) in names {
        let (ns, local) = crate::path::clark_split(name);
        let tag = format!("D:{local}");
        let start = if ns == "DAV:" || ns.is_empty() {
            WEvent::start_element(tag.as_str())
        } else {
            WEvent::start_element(tag.as_str()).ns("x", ns)
        };
        w.write(start).unwrap();
        if !names_only {
            match value {
                PropValue::Text(s) => {
                    if !s.is_empty() {
                        w.write(WEvent::characters(s)).unwrap();
                    }
                }
                PropValue::Xml(fragment) => {
                    // `fragment` is a pre-built XML fragment, not text: writing it
                    // through `characters()` would escape the angle brackets. The
                    // only producer in this crate is `{DAV:}resourcetype`'s
                    // collection marker, so re-emit that one element directly
                    // rather than building a general-purpose fragment splicer.
                    if fragment.contains("collection") {
                        w.write(WEvent::start_element("D:collection")).unwrap();
                        w.write(WEvent::end_element()).unwrap();
                    }
                }
            }
        }
        w.write(WEvent::end_element()).unwrap();
    }
    w.write(WEvent::end_element()).unwrap();
    w.write(WEvent::start_element("D:status")).unwrap();
    w.write(WEvent::characters(status)).unwrap();
    w.write(WEvent::end_element()).unwrap();
    w.write(WEvent::end_element()).unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_body_is_allprop() {
        assert_eq!(parse_propfind(b"").unwrap(), PropfindQuery::AllProp);
        assert_eq!(parse_propfind(b"   \n").unwrap(), PropfindQuery::AllProp);
    }

    #[test]
    fn explicit_allprop_and_propname() {
        let allprop = br#"<?xml version="1.0"?><D:propfind xmlns:D="DAV:"><D:allprop/></D:propfind>"#;
        assert_eq!(parse_propfind(allprop).unwrap(), PropfindQuery::AllProp);

        let propname = br#"<?xml version="1.0"?><D:propfind xmlns:D="DAV:"><D:propname/></D:propfind>"#;
        assert_eq!(parse_propfind(propname).unwrap(), PropfindQuery::PropName);
    }

    #[test]
    fn named_props_are_collected_in_clark_notation() {
        let body = br#"<?xml version="1.0"?><D:propfind xmlns:D="DAV:"><D:prop><D:getetag/><D:displayname/></D:prop></D:propfind>"#;
        match parse_propfind(body).unwrap() {
            PropfindQuery::Props(names) => {
                assert_eq!(names, vec!["{DAV:}getetag".to_string(), "{DAV:}displayname".to_string()]);
            }
            other => panic!("expected Props, got {other:?}"),
        }
    }

    #[test]
    fn multistatus_emits_href_as_propstat_sibling() {
        let entries = vec![ResponseEntry {
            href: "http://x/a".to_string(),
            found: vec![
                ("{DAV:}getetag".to_string(), Some(PropValue::text("abc"))),
                ("{DAV:}missing".to_string(), None),
            ],
            names_only: false,
        }];
        let xml = write_multistatus(&entries);
        assert!(xml.contains("<D:href>http://x/a</D:href>"));
        assert!(xml.contains("200 OK"));
        assert!(xml.contains("404 Not Found"));
    }
}
