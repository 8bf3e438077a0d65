use lasttalk::transcript;

const EXPORT: &str = "\
어머니와의 카카오톡 대화
저장한 날짜 : 2024-03-02 11:20:15

--------------- 2024년 3월 1일 금요일 ---------------
[장나영] [오전 10:16] 안녕하세요
[김철수] [오전 10:17] 반가워요
이어지는 줄입니다
[장나영] [오후 9:03] 저녁 먹었어?
";

#[test]
fn parses_bracket_layout_with_continuations() {
    let turns = transcript::parse_bytes(EXPORT.as_bytes());
    assert_eq!(turns.len(), 3);

    assert_eq!(turns[0].speaker, "장나영");
    assert_eq!(turns[0].text, "안녕하세요");
    assert_eq!(turns[0].timestamp, "2024년 3월 1일 오전 10:16");

    // The unmatched line folds into the previous turn.
    assert_eq!(turns[1].speaker, "김철수");
    assert_eq!(turns[1].text, "반가워요\n이어지는 줄입니다");

    assert_eq!(turns[2].text, "저녁 먹었어?");
    assert_eq!(turns[2].timestamp, "2024년 3월 1일 오후 9:03");
}

#[test]
fn continuation_folds_into_previous_turn() {
    let turns = transcript::parse_bytes(
        "[Alice] [오전 10:16] hi\n[Bob] [오전 10:17] hello\nhow are you".as_bytes(),
    );
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].speaker, "Alice");
    assert_eq!(turns[0].text, "hi");
    assert_eq!(turns[1].speaker, "Bob");
    assert_eq!(turns[1].text, "hello\nhow are you");
}

#[test]
fn parses_comma_layout() {
    let text = "2024. 3. 1 오전 10:16, 장나영 : 안녕하세요\n\
                2024. 3. 1 오전 10:18, 김철수 : 네 안녕하세요";
    let turns = transcript::parse_bytes(text.as_bytes());
    assert_eq!(turns.len(), 2);
    assert_eq!(turns[0].speaker, "장나영");
    assert_eq!(turns[1].speaker, "김철수");
    assert_eq!(turns[1].text, "네 안녕하세요");
}

#[test]
fn orphan_lines_before_any_turn_are_dropped() {
    let text = "그냥 떠도는 줄\n[장나영] [오전 10:16] 첫 메시지";
    let turns = transcript::parse_bytes(text.as_bytes());
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].text, "첫 메시지");
}

#[test]
fn empty_and_unmatched_input_yield_no_turns() {
    assert!(transcript::parse_bytes(b"").is_empty());
    assert!(transcript::parse_bytes("아무 형식도 아닌 텍스트".as_bytes()).is_empty());
}

#[test]
fn utf8_bom_is_stripped() {
    let mut raw = b"\xef\xbb\xbf".to_vec();
    raw.extend_from_slice("[장나영] [오전 10:16] 안녕".as_bytes());
    let turns = transcript::parse_bytes(&raw);
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].speaker, "장나영");
}

#[test]
fn euc_kr_export_is_decoded() {
    let (encoded, _, had_errors) = encoding_rs::EUC_KR.encode("[장나영] [오전 10:16] 안녕하세요");
    assert!(!had_errors);
    let turns = transcript::parse_bytes(&encoded);
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].text, "안녕하세요");
}

#[test]
fn speakers_are_sorted_and_unique() {
    let turns = transcript::parse_bytes(EXPORT.as_bytes());
    let speakers = transcript::speakers(&turns);
    assert_eq!(speakers, vec!["김철수".to_string(), "장나영".to_string()]);
}

#[test]
fn unreadable_path_yields_no_turns() {
    let turns = transcript::parse_file(std::path::Path::new("/nonexistent/chat.txt"));
    assert!(turns.is_empty());
}
