//! Unit tests for the record tokenizer and the quoting formatter

use assert_matches::assert_matches;
use csvmap::config::{CsvConfiguration, NewLine, QuoteStrategy};
use csvmap::error::CsvError;
use csvmap::formatter::RecordFormatter;
use csvmap::parser::CsvParser;

fn parse_with(input: &str, config: &CsvConfiguration) -> Result<Vec<Vec<String>>, CsvError> {
    let mut parser = CsvParser::new(input.as_bytes(), config);
    let mut records = Vec::new();
    while let Some(record) = parser.next_record()? {
        records.push(record);
    }
    Ok(records)
}

fn parse(input: &str) -> Vec<Vec<String>> {
    parse_with(input, &CsvConfiguration::default()).unwrap()
}

fn format_with(rows: &[&[&str]], config: &CsvConfiguration) -> String {
    let mut formatter = RecordFormatter::new(Vec::new(), config);
    for row in rows {
        formatter.write_row(*row).unwrap();
    }
    String::from_utf8(formatter.into_inner()).unwrap()
}

#[cfg(test)]
mod tokenizer_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_simple_records() {
        assert_eq!(
            parse("a,b,c\r\n1,2,3\r\n"),
            vec![vec!["a", "b", "c"], vec!["1", "2", "3"]]
        );
    }

    #[test]
    fn test_mixed_line_endings() {
        assert_eq!(parse("a,b\n1,2\r\n3,4"), vec![vec!["a", "b"], vec!["1", "2"], vec!["3", "4"]]);
    }

    #[test]
    fn test_empty_fields() {
        assert_eq!(parse(",,\n"), vec![vec!["", "", ""]]);
        assert_eq!(parse("a,\n"), vec![vec!["a", ""]]);
    }

    #[test]
    fn test_quoted_delimiter_and_escaped_quote() {
        assert_eq!(
            parse("\"a,b\",\"say \"\"hi\"\"\",c\n"),
            vec![vec!["a,b", "say \"hi\"", "c"]]
        );
    }

    #[test]
    fn test_unneeded_quotes_are_accepted() {
        assert_eq!(parse("\"plain\",\"\"\n"), vec![vec!["plain", ""]]);
    }

    #[test]
    fn test_quoted_field_spans_lines() {
        let config = CsvConfiguration::default();
        let text = "id,note\n1,\"line one\nline two\"\n2,x\n";
        let mut parser = CsvParser::new(text.as_bytes(), &config);
        assert_eq!(parser.next_record().unwrap().unwrap(), vec!["id", "note"]);
        assert_eq!(
            parser.next_record().unwrap().unwrap(),
            vec!["1", "line one\nline two"]
        );
        assert_eq!(parser.row(), 2);
        assert_eq!(parser.raw_row(), 3);
        assert_eq!(parser.next_record().unwrap().unwrap(), vec!["2", "x"]);
        assert!(parser.next_record().unwrap().is_none());
    }

    #[test]
    fn test_unterminated_quote_is_fatal() {
        let result = parse_with("a,\"open\nstill open", &CsvConfiguration::default());
        assert_matches!(result, Err(CsvError::MalformedInput { .. }));
    }

    #[test]
    fn test_blank_lines_skipped_by_default() {
        assert_eq!(parse("a\n\n\nb\n"), vec![vec!["a"], vec!["b"]]);
    }

    #[test]
    fn test_blank_line_kept_as_single_empty_field() {
        let config = CsvConfiguration::default().with_ignore_blank_lines(false);
        assert_eq!(
            parse_with("a\n\nb\n", &config).unwrap(),
            vec![vec!["a".to_string()], vec![String::new()], vec!["b".to_string()]]
        );
    }

    #[test]
    fn test_custom_delimiter_and_quote() {
        let config = CsvConfiguration::default()
            .with_delimiter(';')
            .with_quote('\'');
        assert_eq!(
            parse_with("a;'b;c';'it''s'\n", &config).unwrap(),
            vec![vec!["a", "b;c", "it's"]]
        );
    }

    #[test]
    fn test_custom_record_terminator() {
        let config = CsvConfiguration::default().with_new_line(NewLine::Custom("|".to_string()));
        assert_eq!(
            parse_with("a,b|c,d|", &config).unwrap(),
            vec![vec!["a", "b"], vec!["c", "d"]]
        );
    }

    #[test]
    fn test_comment_lines() {
        let config = CsvConfiguration::default().with_comment(Some('#'));
        assert_eq!(
            parse_with("# generated\na,b\n#skip\n1,2\n", &config).unwrap(),
            vec![vec!["a", "b"], vec!["1", "2"]]
        );
    }

    #[test]
    fn test_raw_record_text() {
        let config = CsvConfiguration::default();
        let mut parser = CsvParser::new("\"x\",y\r\nz\r\n".as_bytes(), &config);
        parser.next_record().unwrap();
        assert_eq!(parser.raw_record(), "\"x\",y\r\n");
    }

    #[test]
    fn test_empty_input() {
        assert!(parse("").is_empty());
    }
}

#[cfg(test)]
mod formatter_tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_smart_quoting() {
        let output = format_with(
            &[&["plain", "a,b", "say \"hi\"", "two\nlines", " padded"]],
            &CsvConfiguration::default(),
        );
        assert_eq!(
            output,
            "plain,\"a,b\",\"say \"\"hi\"\"\",\"two\nlines\",\" padded\"\r\n"
        );
    }

    #[test]
    fn test_always_quote() {
        let config = CsvConfiguration::default().with_quote_strategy(QuoteStrategy::Always);
        assert_eq!(format_with(&[&["a", ""]], &config), "\"a\",\"\"\r\n");
    }

    #[test]
    fn test_new_line_setting() {
        let config = CsvConfiguration::default().with_new_line(NewLine::Lf);
        assert_eq!(format_with(&[&["a", "b"], &["c", "d"]], &config), "a,b\nc,d\n");
    }

    #[test]
    fn test_tab_delimiter_leaves_commas_bare() {
        let config = CsvConfiguration::tab_separated();
        let output = format_with(&[&["a,b", "c\td"]], &config);
        assert!(output.starts_with("a,b\t\"c\td\""));
    }

    #[test]
    fn test_formatted_output_reads_back() {
        let fields = ["", "x", ",", "\"", "\"\"", "a\r\nb", "trailing ", "\"quoted\""];
        let config = CsvConfiguration::default();
        let output = format_with(&[&fields], &config);
        let records = parse_with(&output, &config).unwrap();
        assert_eq!(records, vec![fields.iter().map(|s| s.to_string()).collect::<Vec<_>>()]);
    }
}
