//! Tokenizer tests using rstest for parameterization.

use rstest::rstest;

use jobsh_kernel::parse_line;

#[rstest]
#[case("ls", vec!["ls"], false)]
#[case("ls -l /tmp", vec!["ls", "-l", "/tmp"], false)]
#[case("  echo   hi  ", vec!["echo", "hi"], false)]
#[case("sleep 5 &", vec!["sleep", "5"], true)]
#[case("echo 'hello world'", vec!["echo", "hello world"], false)]
#[case("echo 'a b' c", vec!["echo", "a b", "c"], false)]
#[case("'spaced cmd' arg", vec!["spaced cmd", "arg"], false)]
#[case("", vec![], false)]
#[case("   ", vec![], false)]
#[case("&", vec![], true)]
fn tokenizes_lines(
    #[case] input: &str,
    #[case] argv: Vec<&str>,
    #[case] background: bool,
) {
    let parsed = parse_line(input);
    assert_eq!(parsed.argv, argv);
    assert_eq!(parsed.background, background);
}

#[rstest]
fn unterminated_quote_takes_the_remainder() {
    let parsed = parse_line("echo 'no close");
    assert_eq!(parsed.argv, vec!["echo", "no close"]);
    assert!(!parsed.background);
}
