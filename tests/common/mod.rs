#![allow(dead_code)]

use studybank::db::Db;
use studybank::import::UploadDir;
use studybank::models::{
    McqOption, Module, NewQuestion, QuestionBody, Subject, SubmoduleMeta, SubmoduleWithQuestions,
};
use studybank::App;
use tempfile::TempDir;

/// A database and upload directory in a private temp dir, removed on drop.
pub struct TestDb {
    pub db: Db,
    pub uploads: UploadDir,
    _dir: TempDir,
}

impl TestDb {
    pub fn app(&self) -> App {
        App {
            db: self.db.clone(),
            uploads: self.uploads.clone(),
        }
    }

    pub fn staged_uploads(&self) -> usize {
        std::fs::read_dir(self.uploads.path()).unwrap().count()
    }
}

pub async fn create_test_db() -> TestDb {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let url = format!("sqlite://{}", dir.path().join("studybank.db").display());
    let db = Db::new(&url).await.expect("failed to create test database");
    let uploads = UploadDir::provision(dir.path().join("uploads")).expect("failed to provision uploads");
    TestDb {
        db,
        uploads,
        _dir: dir,
    }
}

pub fn mcq(text: &str) -> NewQuestion {
    NewQuestion {
        question_text: text.to_string(),
        body: QuestionBody::Mcq {
            options: vec![
                McqOption {
                    option_text: "right".to_string(),
                    is_correct: true,
                },
                McqOption {
                    option_text: "wrong".to_string(),
                    is_correct: false,
                },
            ],
        },
    }
}

pub fn meta(module_id: i64, name: &str) -> SubmoduleMeta {
    SubmoduleMeta {
        name: name.to_string(),
        module_id,
        difficulty: "easy".to_string(),
        is_pro: false,
    }
}

/// Math → Algebra → Linear Equations with three mcq questions.
pub async fn seed_math(db: &Db) -> (Subject, Module, SubmoduleWithQuestions) {
    let subject = db
        .create_subject("Math", Some("Numbers and shapes"))
        .await
        .unwrap();
    let module = db.create_module(subject.id, "Algebra").await.unwrap();
    let draft = meta(module.id, "Linear Equations").validate().unwrap();
    let submodule = db
        .create_submodule_with_questions(draft, vec![mcq("Q1"), mcq("Q2"), mcq("Q3")])
        .await
        .unwrap();
    (subject, module, submodule)
}
