mod common;

use common::{create_test_db, mcq, TestDb};
use rust_xlsxwriter::{Workbook, Worksheet, XlsxError};
use studybank::hierarchy::Level;
use studybank::import::{read_records, UploadFormat};
use studybank::models::{Mapping, McqOption, QuestionBody, SubmoduleMeta};
use studybank::services::Upload;

const XLSX: &str = "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

async fn algebra(t: &TestDb) -> i64 {
    let subject = t.db.create_subject("Math", None).await.unwrap();
    t.db.create_module(subject.id, "Algebra").await.unwrap().id
}

fn meta(module_id: i64) -> SubmoduleMeta {
    SubmoduleMeta {
        name: "Linear Equations".to_string(),
        module_id,
        difficulty: "hard".to_string(),
        is_pro: true,
    }
}

fn upload(file_name: &str, content_type: &str, body: &str) -> Upload {
    Upload {
        file_name: file_name.to_string(),
        content_type: content_type.to_string(),
        bytes: body.as_bytes().to_vec(),
    }
}

fn xlsx(fill: impl FnOnce(&mut Worksheet) -> Result<(), XlsxError>) -> Vec<u8> {
    let mut workbook = Workbook::new();
    fill(workbook.add_worksheet()).unwrap();
    workbook.save_to_buffer().unwrap()
}

fn write_headers(sheet: &mut Worksheet, headers: &[&str]) -> Result<(), XlsxError> {
    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }
    Ok(())
}

async fn count(t: &TestDb, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(t.db.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn json_import_creates_submodule_with_questions_in_order() {
    let t = create_test_db().await;
    let module_id = algebra(&t).await;

    let body = r#"{"questions": [
        {"questionText": "2x = 4, x = ?", "options": [
            {"optionText": "1"}, {"optionText": "2", "isCorrect": true}
        ]},
        {"questionText": "x + 1 = 1 has solution 0", "questionType": "TrueFalse", "correctAnswer": true},
        {"questionText": "x + _ = 3, x = 1", "questionType": "fillblanks", "blanks": ["2"]},
        {"questionText": "Match", "questionType": "matchfollowing",
         "leftItems": ["x+1=2", "x+2=2"], "rightItems": ["0", "1"],
         "correctMappings": [{"leftIndex": 0, "rightIndex": 1}, {"leftIndex": 1, "rightIndex": 0}]}
    ]}"#;

    let outcome = t
        .app()
        .importer()
        .import_questions(
            meta(module_id),
            upload("algebra.json", "application/json; charset=utf-8", body),
        )
        .await
        .unwrap();

    assert_eq!(outcome.question_count, 4);
    let stored = t
        .db
        .submodule_with_questions(outcome.submodule.submodule.id)
        .await
        .unwrap();
    assert!(stored.submodule.is_pro);
    assert_eq!(stored.submodule.active, Some(true));
    assert_eq!(
        stored.submodule.question_ids,
        stored.questions.iter().map(|q| q.id).collect::<Vec<_>>()
    );
    let types: Vec<_> = stored
        .questions
        .iter()
        .map(|q| q.body.question_type().as_str())
        .collect();
    assert_eq!(types, vec!["mcq", "truefalse", "fillblanks", "matchfollowing"]);
    assert!(stored
        .questions
        .iter()
        .all(|q| q.submodule_id == stored.submodule.id));

    let module = t.db.module(module_id).await.unwrap();
    assert_eq!(module.submodule_ids, vec![stored.submodule.id]);
    assert_eq!(t.staged_uploads(), 0);
}

#[tokio::test]
async fn one_malformed_record_rolls_back_everything() {
    let t = create_test_db().await;
    let module_id = algebra(&t).await;

    let body = r#"{"questions": [
        {"questionText": "Q1", "questionType": "truefalse", "correctAnswer": true},
        {"questionText": "Q2", "questionType": "truefalse", "correctAnswer": false},
        {"questionText": "Q3", "questionType": "mcq"},
        {"questionText": "Q4", "questionType": "truefalse", "correctAnswer": true},
        {"questionText": "Q5", "questionType": "truefalse", "correctAnswer": true}
    ]}"#;

    let err = t
        .app()
        .importer()
        .import_questions(meta(module_id), upload("q.json", "application/json", body))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "validation");
    assert!(err.to_string().contains("record 3"), "{err}");
    assert!(t.db.submodules(module_id, true).await.unwrap().is_empty());
    let questions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM questions")
        .fetch_one(t.db.pool())
        .await
        .unwrap();
    assert_eq!(questions, 0);
    assert_eq!(t.staged_uploads(), 0);
}

#[tokio::test]
async fn csv_import_reads_numbered_columns_and_mappings() {
    let t = create_test_db().await;
    let module_id = algebra(&t).await;

    let body = "\
questionText,questionType,option1,isCorrect1,option2,isCorrect2,correctAnswer,blank1,leftItem1,leftItem2,leftItem3,rightItem1,rightItem2,rightItem3,correctMappings
Pick 2,,1,false,2,true,,,,,,,,,
Zero is even,truefalse,,,,,TRUE,,,,,,,,
Match,matchfollowing,,,,,,,a,b,c,x,y,z,\"0:2,1:0,2:1\"
,,,,,,,,,,,,,,
";

    let outcome = t
        .app()
        .importer()
        .import_questions(meta(module_id), upload("q.csv", "text/csv", body))
        .await
        .unwrap();

    assert_eq!(outcome.question_count, 3);
    let questions = &outcome.submodule.questions;
    assert_eq!(
        questions[1].body,
        QuestionBody::TrueFalse {
            correct_answer: true
        }
    );
    let QuestionBody::MatchFollowing {
        correct_mappings, ..
    } = &questions[2].body
    else {
        panic!("expected matchfollowing");
    };
    assert_eq!(
        correct_mappings,
        &vec![
            Mapping {
                left_index: 0,
                right_index: 2
            },
            Mapping {
                left_index: 1,
                right_index: 0
            },
            Mapping {
                left_index: 2,
                right_index: 1
            },
        ]
    );
    assert_eq!(t.staged_uploads(), 0);
}

#[tokio::test]
async fn unknown_module_is_not_found() {
    let t = create_test_db().await;

    let err = t
        .app()
        .importer()
        .import_questions(
            meta(404),
            upload("q.json", "application/json", r#"{"questions": []}"#),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "not_found");
    assert_eq!(err.to_string(), "module 404 not found");
}

#[tokio::test]
async fn unsupported_file_type_is_rejected() {
    let t = create_test_db().await;
    let module_id = algebra(&t).await;

    let err = t
        .app()
        .importer()
        .import_questions(meta(module_id), upload("q.txt", "text/plain", "hello"))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "validation");
    assert!(t.db.submodules(module_id, true).await.unwrap().is_empty());
    assert_eq!(t.staged_uploads(), 0);
}

#[tokio::test]
async fn malformed_json_is_a_parse_error() {
    let t = create_test_db().await;
    let module_id = algebra(&t).await;

    let err = t
        .app()
        .importer()
        .import_questions(
            meta(module_id),
            upload("q.json", "application/json", r#"{"questions": "#),
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "parse");
    assert_eq!(t.staged_uploads(), 0);
}

#[tokio::test]
async fn empty_file_creates_empty_submodule() {
    let t = create_test_db().await;
    let module_id = algebra(&t).await;

    let outcome = t
        .app()
        .importer()
        .import_questions(
            meta(module_id),
            upload("q.json", "application/json", r#"{"questions": []}"#),
        )
        .await
        .unwrap();

    assert_eq!(outcome.question_count, 0);
    assert!(outcome.submodule.submodule.question_ids.is_empty());
}

#[test]
fn spreadsheet_cells_are_read_as_text_below_the_header_row() {
    let bytes = xlsx(|sheet| {
        write_headers(sheet, &["questionText", "option1", "isCorrect1"])?;
        sheet.write_string(1, 0, "Pick 2.5")?;
        sheet.write_number(1, 1, 2.5)?;
        sheet.write_boolean(1, 2, true)?;
        Ok(())
    });

    let records = read_records(UploadFormat::Spreadsheet, bytes.as_slice()).unwrap();

    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["questionText"], "Pick 2.5");
    assert_eq!(records[0]["option1"], "2.5");
    assert_eq!(records[0]["isCorrect1"], "true");
}

#[tokio::test]
async fn spreadsheet_import_caps_numbered_columns() {
    let t = create_test_db().await;
    let module_id = algebra(&t).await;

    let mut headers = vec!["questionText", "questionType", "correctAnswer", "correctMappings"];
    let numbered: Vec<String> = (1..=6)
        .flat_map(|i| {
            [
                format!("option{i}"),
                format!("isCorrect{i}"),
                format!("blank{i}"),
                format!("leftItem{i}"),
                format!("rightItem{i}"),
            ]
        })
        .collect();
    headers.extend(numbered.iter().map(String::as_str));
    let col = |name: &str| headers.iter().position(|h| *h == name).unwrap() as u16;

    let bytes = xlsx(|sheet| {
        write_headers(sheet, &headers)?;

        sheet.write_string(1, col("questionText"), "Pick 2.5")?;
        for i in 1..=5 {
            sheet.write_number(1, col(&format!("option{i}")), i as f64 + 0.5)?;
        }
        sheet.write_boolean(1, col("isCorrect2"), true)?;
        sheet.write_boolean(1, col("isCorrect1"), false)?;

        sheet.write_string(2, col("questionText"), "Two is even")?;
        sheet.write_string(2, col("questionType"), "truefalse")?;
        sheet.write_boolean(2, col("correctAnswer"), true)?;

        sheet.write_string(3, col("questionText"), "Fill them")?;
        sheet.write_string(3, col("questionType"), "fillblanks")?;
        for i in 1..=6 {
            sheet.write_string(3, col(&format!("blank{i}")), format!("b{i}"))?;
        }

        sheet.write_string(4, col("questionText"), "Match them")?;
        sheet.write_string(4, col("questionType"), "matchfollowing")?;
        for i in 1..=6 {
            sheet.write_string(4, col(&format!("leftItem{i}")), format!("l{i}"))?;
            sheet.write_string(4, col(&format!("rightItem{i}")), format!("r{i}"))?;
        }
        sheet.write_string(4, col("correctMappings"), "0:1,1:0")?;
        Ok(())
    });

    let outcome = t
        .app()
        .importer()
        .import_questions(
            meta(module_id),
            Upload {
                file_name: "algebra.xlsx".to_string(),
                content_type: XLSX.to_string(),
                bytes,
            },
        )
        .await
        .unwrap();

    assert_eq!(outcome.question_count, 4);
    let questions = &outcome.submodule.questions;

    let option = |text: &str, is_correct: bool| McqOption {
        option_text: text.to_string(),
        is_correct,
    };
    assert_eq!(
        questions[0].body,
        QuestionBody::Mcq {
            options: vec![
                option("1.5", false),
                option("2.5", true),
                option("3.5", false),
                option("4.5", false),
            ]
        }
    );
    assert_eq!(
        questions[1].body,
        QuestionBody::TrueFalse {
            correct_answer: true
        }
    );
    assert_eq!(
        questions[2].body,
        QuestionBody::FillBlanks {
            blanks: (1..=5).map(|i| format!("b{i}")).collect()
        }
    );
    let QuestionBody::MatchFollowing {
        left_items,
        right_items,
        correct_mappings,
    } = &questions[3].body
    else {
        panic!("expected matchfollowing");
    };
    assert_eq!(left_items.len(), 5);
    assert_eq!(right_items.last().map(String::as_str), Some("r5"));
    assert_eq!(correct_mappings.len(), 2);
    assert_eq!(t.staged_uploads(), 0);
}

#[tokio::test]
async fn storage_failure_mid_import_leaves_nothing_behind() {
    let t = create_test_db().await;
    let module_id = algebra(&t).await;
    sqlx::query(
        "CREATE TRIGGER reject_q3 BEFORE INSERT ON questions \
         WHEN NEW.question_text = 'Q3' BEGIN SELECT RAISE(ABORT, 'no Q3'); END",
    )
    .execute(t.db.pool())
    .await
    .unwrap();

    let body = r#"{"questions": [
        {"questionText": "Q1", "questionType": "truefalse", "correctAnswer": true},
        {"questionText": "Q2", "questionType": "truefalse", "correctAnswer": false},
        {"questionText": "Q3", "questionType": "truefalse", "correctAnswer": true},
        {"questionText": "Q4", "questionType": "truefalse", "correctAnswer": true},
        {"questionText": "Q5", "questionType": "truefalse", "correctAnswer": false}
    ]}"#;

    let err = t
        .app()
        .importer()
        .import_questions(meta(module_id), upload("q.json", "application/json", body))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), "storage");
    assert_eq!(count(&t, "submodules").await, 0);
    assert_eq!(count(&t, "questions").await, 0);
    assert_eq!(count(&t, "submodule_questions").await, 0);
    assert!(t.db.module(module_id).await.unwrap().submodule_ids.is_empty());
    assert_eq!(t.staged_uploads(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_imports_and_toggles_all_commit() {
    let t = create_test_db().await;
    let module_id = algebra(&t).await;

    let imports: Vec<_> = (0..40)
        .map(|i| {
            let db = t.db.clone();
            tokio::spawn(async move {
                let draft = common::meta(module_id, &format!("Set {i}")).validate()?;
                db.create_submodule_with_questions(draft, vec![mcq("Q1"), mcq("Q2")])
                    .await
            })
        })
        .collect();
    let toggles: Vec<_> = (0..10)
        .map(|i| {
            let hierarchy = t.app().hierarchy();
            tokio::spawn(async move {
                hierarchy
                    .toggle_active(Level::Module, module_id, i % 2 == 1)
                    .await
            })
        })
        .collect();

    for handle in imports {
        let submodule = handle.await.unwrap().unwrap();
        assert_eq!(submodule.questions.len(), 2);
    }
    for handle in toggles {
        handle.await.unwrap().unwrap();
    }

    assert_eq!(t.db.module(module_id).await.unwrap().submodule_ids.len(), 40);
    assert_eq!(count(&t, "submodules").await, 40);
    assert_eq!(count(&t, "submodule_questions").await, 80);
}
