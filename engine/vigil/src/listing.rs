//! Listing of test cases and reporters instead of running.

use std::fmt::Write as _;

use crate::config::{Config, ListSpec};
use crate::output::Sink;
use crate::registry::TestRegistry;
use crate::reporter::ReporterRegistry;

/// Write what the configuration's `ListSpec` asks for: the test cases
/// selected by the configured specs and/or the reporter names.
pub fn write_listing(
    config: &Config,
    tests: &TestRegistry,
    reporters: &ReporterRegistry,
    sink: &mut Sink,
) {
    let list = config.list();
    let test_cases: Vec<(&str, &str)> = tests
        .matching(config.test_specs())
        .map(|case| (case.name(), case.description()))
        .collect();
    let reporter_entries = reporters.descriptions();

    let text = if list.contains(ListSpec::AS_XML) {
        render_xml(list, &test_cases, &reporter_entries)
    } else {
        render_text(list, &test_cases, &reporter_entries)
    };
    sink.text(&text);
    sink.flush();
}

fn render_text(list: ListSpec, tests: &[(&str, &str)], reporters: &[(&str, &str)]) -> String {
    let mut out = String::new();
    if list.contains(ListSpec::TESTS) {
        out.push_str("Matching test cases:\n");
        for (name, description) in tests {
            let _ = writeln!(out, "  {name}");
            if !description.is_empty() {
                let _ = writeln!(out, "      {description}");
            }
        }
        let noun = if tests.len() == 1 { "test case" } else { "test cases" };
        let _ = writeln!(out, "{} matching {noun}", tests.len());
    }
    if list.contains(ListSpec::REPORTERS) {
        if list.contains(ListSpec::TESTS) {
            out.push('\n');
        }
        out.push_str("Available reporters:\n");
        for (name, description) in reporters {
            let _ = writeln!(out, "  {name}");
            let _ = writeln!(out, "      {description}");
        }
    }
    out
}

fn render_xml(list: ListSpec, tests: &[(&str, &str)], reporters: &[(&str, &str)]) -> String {
    let mut out = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<listing>\n");
    if list.contains(ListSpec::TESTS) {
        let _ = writeln!(out, "  <test-cases count=\"{}\">", tests.len());
        for (name, description) in tests {
            let _ = writeln!(
                out,
                "    <test-case name=\"{}\" description=\"{}\"/>",
                escape_xml(name),
                escape_xml(description)
            );
        }
        out.push_str("  </test-cases>\n");
    }
    if list.contains(ListSpec::REPORTERS) {
        out.push_str("  <reporters>\n");
        for (name, description) in reporters {
            let _ = writeln!(
                out,
                "    <reporter name=\"{}\" description=\"{}\"/>",
                escape_xml(name),
                escape_xml(description)
            );
        }
        out.push_str("  </reporters>\n");
    }
    out.push_str("</listing>\n");
    out
}

fn escape_xml(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
#[expect(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests {
    use super::*;
    use crate::config::ConfigData;
    use crate::output::SharedBuffer;
    use crate::registry::RegistryBuilder;
    use pretty_assertions::assert_eq;

    fn registry() -> TestRegistry {
        let mut builder = RegistryBuilder::new();
        builder
            .register("parse/ints", "integer parsing", |_ctx| Ok(()))
            .register("parse/floats", "", |_ctx| Ok(()))
            .register("format <html>", "escapes \"quotes\"", |_ctx| Ok(()));
        builder.build().unwrap()
    }

    fn listing(list: ListSpec, specs: &[&str]) -> String {
        let config = Config::new(ConfigData {
            list,
            test_specs: specs.iter().map(ToString::to_string).collect(),
            ..ConfigData::default()
        })
        .unwrap();
        let buffer = SharedBuffer::new();
        let mut sink = Sink::buffer(&buffer);
        write_listing(&config, &registry(), &ReporterRegistry::with_builtins(), &mut sink);
        buffer.contents()
    }

    #[test]
    fn test_lists_matching_tests_as_text() {
        assert_eq!(
            listing(ListSpec::TESTS, &["parse/*"]),
            "Matching test cases:\n  parse/ints\n      integer parsing\n  parse/floats\n2 matching test cases\n"
        );
    }

    #[test]
    fn test_lists_reporters_as_text() {
        assert_eq!(
            listing(ListSpec::REPORTERS, &[]),
            "Available reporters:\n  console\n      Reports results as lines of text\n  log\n      Writes every lifecycle event as an indented label log\n"
        );
    }

    #[test]
    fn test_single_match_is_singular() {
        let text = listing(ListSpec::ALL, &["parse/ints"]);
        assert!(text.contains("1 matching test case\n"));
        assert!(text.contains("\n\nAvailable reporters:\n"));
    }

    #[test]
    fn test_xml_listing_escapes_attributes() {
        let xml = listing(ListSpec::TESTS | ListSpec::AS_XML, &["format*"]);
        assert_eq!(
            xml,
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<listing>\n  <test-cases count=\"1\">\n    <test-case name=\"format &lt;html&gt;\" description=\"escapes &quot;quotes&quot;\"/>\n  </test-cases>\n</listing>\n"
        );
    }

    #[test]
    fn test_xml_listing_of_reporters() {
        let xml = listing(ListSpec::REPORTERS | ListSpec::AS_XML, &[]);
        assert!(xml.contains("<reporter name=\"console\""));
        assert!(xml.contains("<reporter name=\"log\""));
        assert!(!xml.contains("<test-cases"));
    }
}
