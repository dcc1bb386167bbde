
use pdf_quiz::quiz::{validate_quiz, AnswerLetter, PartialQuestion, Question, QuestionCount};
use test_utils::*;

#[test]
fn valid_quiz_passes() {
    let count = QuestionCount::new(5).unwrap();
    let questions = validate_quiz(&quiz_json(5), count).unwrap();
    assert_eq!(questions, sample_questions(5));
}

#[test]
fn wrong_length_is_rejected() {
    let count = QuestionCount::new(4).unwrap();
    let err = validate_quiz(&quiz_json(3), count).unwrap_err();
    assert!(err.to_string().contains("expected 4 questions, got 3"), "{err}");

    let err = validate_quiz(&quiz_json(5), count).unwrap_err();
    assert!(err.to_string().contains("expected 4 questions, got 5"), "{err}");
}

#[test]
fn three_options_are_rejected() {
    let json = r#"[{"question":"Q?","options":["a","b","c"],"answer":"A"},
                  {"question":"Q2?","options":["a","b","c","d"],"answer":"B"},
                  {"question":"Q3?","options":["a","b","c","d"],"answer":"C"}]"#;
    let err = validate_quiz(json, QuestionCount::new(3).unwrap()).unwrap_err();
    assert_eq!(err.issues.len(), 1);
    assert!(err.issues[0].starts_with("question 1:"), "{err}");
}

#[test]
fn unknown_answer_letter_is_rejected() {
    let json = r#"[{"question":"Q?","options":["a","b","c","d"],"answer":"E"},
                  {"question":"Q2?","options":["a","b","c","d"],"answer":"B"},
                  {"question":"Q3?","options":["a","b","c","d"],"answer":"C"}]"#;
    let err = validate_quiz(json, QuestionCount::new(3).unwrap()).unwrap_err();
    assert!(err.issues[0].starts_with("question 1:"), "{err}");
}

#[test]
fn all_issues_are_reported_together() {
    let json = r#"[{"question":"","options":["a","b","c","d"],"answer":"A"},
                  {"question":"Q2?","options":["a","","c","d"],"answer":"B"}]"#;
    let err = validate_quiz(json, QuestionCount::new(3).unwrap()).unwrap_err();
    assert_eq!(err.issues.len(), 3, "{err}");
    assert!(err.issues.iter().any(|i| i == "question 1: question text is empty"));
    assert!(err.issues.iter().any(|i| i == "question 2: option B is empty"));
}

#[test]
fn non_array_is_rejected() {
    let err = validate_quiz(r#"{"question":"Q?"}"#, QuestionCount::default()).unwrap_err();
    assert!(err.to_string().contains("not a JSON array"));
}

#[test]
fn question_count_accepts_only_supported_values() {
    for n in QuestionCount::ALLOWED {
        assert_eq!(QuestionCount::new(n).unwrap().get(), n as usize);
    }
    for n in [0, 1, 2, 7, 9, 11, 100] {
        assert!(QuestionCount::new(n).is_err(), "{n} should be rejected");
    }
    assert_eq!(QuestionCount::default().get(), 4);

    let parsed: Result<QuestionCount, _> = serde_json::from_str("7");
    assert!(parsed.is_err());
    let parsed: QuestionCount = serde_json::from_str("8").unwrap();
    assert_eq!(serde_json::to_string(&parsed).unwrap(), "8");
}

#[test]
fn answer_letters_round_trip_through_indices() {
    for (i, letter) in AnswerLetter::ALL.iter().enumerate() {
        assert_eq!(letter.index(), i);
        assert_eq!(AnswerLetter::from_index(i), Some(*letter));
    }
    assert_eq!(AnswerLetter::from_index(4), None);
    assert_eq!(AnswerLetter::parse(" c "), Some(AnswerLetter::C));
    assert_eq!(AnswerLetter::parse("E"), None);
    assert_eq!(sample_question(2).correct_option(), "Option C2");
}

#[test]
fn partial_question_is_populated_only_when_complete() {
    let mut partial = PartialQuestion {
        question: Some("Which organelle makes ATP?".to_string()),
        options: Some(vec!["Mitochondria".into(), "Nucleus".into(), "Ribosome".into()]),
        answer: None,
    };
    assert!(!partial.is_populated());

    partial.options.as_mut().unwrap().push("Golgi".into());
    assert!(!partial.is_populated());

    partial.answer = Some("A".to_string());
    let question: Question = partial.to_question().unwrap();
    assert_eq!(question.correct_option(), "Mitochondria");

    partial.answer = Some("Z".to_string());
    assert!(!partial.is_populated());
}
