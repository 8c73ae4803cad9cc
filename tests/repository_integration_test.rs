// ==========================================
// Repository 层集成测试
// ==========================================
// 测试目标: 在真实 SQLite 文件库上验证 CRUD / 查询 DSL / 投影 / 错误翻译
// ==========================================


use model_repository::logging;
use model_repository::{
    Clause, ColumnSelection, DatabaseErrorKind, ExecOptions, Operators, ReadOptions, Record,
    Repository,
};
use serde_json::json;
use test_helpers::{create_test_db, flags_repo, seed_users, users_repo, Flag, User};

fn names(users: &[User]) -> Vec<String> {
    users.iter().filter_map(|u| u.name.clone()).collect()
}

// ==========================================
// 空表与 to_throw
// ==========================================

#[tokio::test]
async fn test_find_on_empty_table_is_not_found() {
    logging::init_test();
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);

    let err = repo
        .find(&[], &ColumnSelection::all(), ReadOptions::new())
        .await
        .unwrap_err();
    assert_eq!(err.kind(), DatabaseErrorKind::ModelNotFound);
    assert_eq!(err.interpolation()["tableName"], "users");
    assert_eq!(err.localized("en"), "No record found in users");

    let rows = repo
        .find(&[], &ColumnSelection::all(), ReadOptions::new().no_throw())
        .await
        .unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn test_find_all_and_count_on_empty_table() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);

    let err = repo
        .find_all(&ColumnSelection::all(), ReadOptions::new())
        .await
        .unwrap_err();
    assert!(err.is_empty_outcome());

    // 计数为 0 不是失败
    assert_eq!(repo.count(None, ReadOptions::new()).await.unwrap(), 0);
}

// ==========================================
// insert
// ==========================================

#[tokio::test]
async fn test_insert_returns_rows_with_generated_ids() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);

    let created = seed_users(&repo).await;

    assert_eq!(created.len(), 4);
    assert_eq!(created[0].id, Some(1));
    assert_eq!(created[0].email, "alice@example.com");
    assert_eq!(names(&created), vec!["Alice", "Bob", "Carol", "Dave"]);
}

#[tokio::test]
async fn test_insert_duplicate_email_is_unique_constraint_error() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);
    seed_users(&repo).await;

    let duplicate = User::new("alice@example.com", "Alice 2", 31);
    let err = repo
        .insert(&[duplicate.clone()], &ColumnSelection::all(), ExecOptions::new())
        .await
        .unwrap_err();

    assert_eq!(err.kind(), DatabaseErrorKind::ModelUniqueConstraintError);
    assert_eq!(err.code(), 500);
    assert_eq!(err.interpolation()["tableName"], "users");
    assert_eq!(err.interpolation()["constraint"], "users.email");

    // 序列化结果不含驱动细节
    let wire = serde_json::to_value(&err).unwrap();
    assert_eq!(wire["kind"], "MODEL_UNIQUE_CONSTRAINT_ERROR");
    assert!(wire.get("cause").is_none());

    let created = repo
        .insert(&[duplicate], &ColumnSelection::all(), ExecOptions::new().no_throw())
        .await
        .unwrap();
    assert!(created.is_empty());
}

#[tokio::test]
async fn test_heterogeneous_insert_is_atomic() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);
    seed_users(&repo).await;

    let mut without_age = User::new("bob@example.com", "Bob again", 0);
    without_age.age = None;

    // 字段集合不同 → 多条语句; 第二条冲突, 第一条必须一起回滚
    let err = repo
        .insert(
            &[User::new("erin@example.com", "Erin", 22), without_age],
            &ColumnSelection::all(),
            ExecOptions::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), DatabaseErrorKind::ModelUniqueConstraintError);

    assert_eq!(repo.count(None, ReadOptions::new()).await.unwrap(), 4);
}

#[tokio::test]
async fn test_insert_with_projection() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo: Repository<Record> = Repository::new("users", db.executor().unwrap());

    let row = match json!({"email": "zoe@example.com", "name": "Zoe", "age": 28}) {
        serde_json::Value::Object(map) => map,
        _ => unreachable!(),
    };
    let created = repo
        .insert(
            &[row],
            &ColumnSelection::all().include("id").rename("email", "login"),
            ExecOptions::new(),
        )
        .await
        .unwrap();

    assert_eq!(created[0].keys().collect::<Vec<_>>(), vec!["id", "login"]);
    assert_eq!(created[0]["login"], json!("zoe@example.com"));
}

// ==========================================
// find / find_one / 查询 DSL
// ==========================================

#[tokio::test]
async fn test_projection_orders_and_renames_columns() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    seed_users(&users_repo(&db)).await;
    let repo: Repository<Record> = Repository::new("users", db.executor().unwrap());

    let selection =
        ColumnSelection::try_from(json!({"id": true, "name": "displayName", "email": false}))
            .unwrap();
    let rows = repo
        .find(
            &[Clause::simple([("id", json!(1))])],
            &selection,
            ReadOptions::new(),
        )
        .await
        .unwrap();

    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].keys().collect::<Vec<_>>(), vec!["id", "displayName"]);
    assert_eq!(rows[0]["displayName"], json!("Alice"));
}

#[tokio::test]
async fn test_zero_clauses_returns_every_row_within_window() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);
    seed_users(&repo).await;

    let all = repo
        .find(&[], &ColumnSelection::all(), ReadOptions::new())
        .await
        .unwrap();
    assert_eq!(all.len(), 4);

    let page = repo
        .find_all(&ColumnSelection::all(), ReadOptions::new().limit(2).offset(1))
        .await
        .unwrap();
    assert_eq!(names(&page), vec!["Bob", "Carol"]);

    let tail = repo
        .find_all(&ColumnSelection::all(), ReadOptions::new().offset(3))
        .await
        .unwrap();
    assert_eq!(names(&tail), vec!["Dave"]);
}

#[tokio::test]
async fn test_simple_clauses_are_alternatives() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);
    seed_users(&repo).await;

    let rows = repo
        .find(
            &[
                Clause::simple([("name", json!("Alice")), ("age", json!(30))]),
                Clause::simple([("name", json!("Carol")), ("age", json!(45))]),
            ],
            &ColumnSelection::all(),
            ReadOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(names(&rows), vec!["Alice", "Carol"]);

    // 第一个分支内 AND 不成立
    let rows = repo
        .find(
            &[
                Clause::simple([("name", json!("Alice")), ("age", json!(99))]),
                Clause::simple([("name", json!("Bob"))]),
            ],
            &ColumnSelection::all(),
            ReadOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(names(&rows), vec!["Bob"]);
}

#[tokio::test]
async fn test_complex_range_clause() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);
    seed_users(&repo).await;

    let adults = repo
        .find(
            &[Clause::complex([("age", Operators::new().gte(18).lt(65))])],
            &ColumnSelection::all(),
            ReadOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(names(&adults), vec!["Alice", "Carol"]);

    // 空运算符集合不产生谓词
    let everyone = repo
        .find(
            &[Clause::complex([("age", Operators::new())])],
            &ColumnSelection::all(),
            ReadOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(everyone.len(), 4);
}

#[tokio::test]
async fn test_mixed_clauses_and_set_operators() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);
    seed_users(&repo).await;

    let rows = repo
        .find(
            &[
                Clause::simple([("name", json!("Bob"))]),
                Clause::complex([
                    ("name", Operators::new().not_in(["Alice"])),
                    ("age", Operators::new().gt(40)),
                ]),
            ],
            &ColumnSelection::all(),
            ReadOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(names(&rows), vec!["Bob", "Carol", "Dave"]);

    let rows = repo
        .find(
            &[Clause::complex([
                ("email", Operators::new().like("%o%@example.com")),
                ("name", Operators::new().is_in(["Bob", "Carol", "Zed"])),
            ])],
            &ColumnSelection::all(),
            ReadOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(names(&rows), vec!["Bob", "Carol"]);
}

#[tokio::test]
async fn test_blank_operands_are_ignored() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);
    seed_users(&repo).await;

    let empty: [&str; 0] = [];
    let rows = repo
        .find(
            &[Clause::complex([
                ("name", Operators::new().like("").is_in(empty)),
                ("age", Operators::new().lte(17)),
            ])],
            &ColumnSelection::all(),
            ReadOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(names(&rows), vec!["Bob"]);
}

#[tokio::test]
async fn test_find_one() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);
    seed_users(&repo).await;

    let carol = repo
        .find_one(
            &[Clause::from_partial(&json!({"email": "carol@example.com", "name": null})).unwrap()],
            &ColumnSelection::all(),
            ExecOptions::new(),
        )
        .await
        .unwrap()
        .expect("carol exists");
    assert_eq!(carol.age, Some(45));

    let err = repo
        .find_one(
            &[Clause::simple([("email", json!("nobody@example.com"))])],
            &ColumnSelection::all(),
            ExecOptions::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), DatabaseErrorKind::ModelNotFound);
}

// ==========================================
// update / delete / truncate / count
// ==========================================

#[tokio::test]
async fn test_update_returns_updated_rows() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);
    seed_users(&repo).await;

    let updated = repo
        .update(
            &json!({"name": "Teen", "age": null}),
            &[Clause::complex([("age", Operators::new().lt(18))])],
            &ColumnSelection::all(),
            ExecOptions::new(),
        )
        .await
        .unwrap();

    assert_eq!(updated.len(), 1);
    assert_eq!(updated[0].name.as_deref(), Some("Teen"));
    // null 字段未参与更新
    assert_eq!(updated[0].age, Some(17));
}

#[tokio::test]
async fn test_update_zero_rows_is_not_updated() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);
    seed_users(&repo).await;

    let err = repo
        .update(
            &json!({"name": "Ghost"}),
            &[Clause::simple([("id", json!(999))])],
            &ColumnSelection::all(),
            ExecOptions::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), DatabaseErrorKind::ModelNotUpdated);

    let updated = repo
        .update(
            &json!({"name": "Ghost"}),
            &[Clause::simple([("id", json!(999))])],
            &ColumnSelection::all(),
            ExecOptions::new().no_throw(),
        )
        .await
        .unwrap();
    assert!(updated.is_empty());
}

#[tokio::test]
async fn test_update_into_duplicate_is_unique_constraint_error() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);
    seed_users(&repo).await;

    let err = repo
        .update(
            &json!({"email": "alice@example.com"}),
            &[Clause::simple([("name", json!("Bob"))])],
            &ColumnSelection::all(),
            ExecOptions::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), DatabaseErrorKind::ModelUniqueConstraintError);
    assert_eq!(err.interpolation()["constraint"], "users.email");
}

#[tokio::test]
async fn test_delete_and_zero_row_delete() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);
    seed_users(&repo).await;

    let minors = [Clause::complex([("age", Operators::new().lt(18))])];
    assert_eq!(repo.delete(&minors, ExecOptions::new()).await.unwrap(), 1);

    let err = repo.delete(&minors, ExecOptions::new()).await.unwrap_err();
    assert_eq!(err.kind(), DatabaseErrorKind::ModelNotDeleted);

    assert_eq!(repo.delete(&minors, ExecOptions::new().no_throw()).await.unwrap(), 0);
    assert_eq!(repo.count(None, ReadOptions::new()).await.unwrap(), 3);
}

#[tokio::test]
async fn test_count_with_clauses_and_window() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);
    seed_users(&repo).await;

    let adults = [Clause::complex([("age", Operators::new().gte(18))])];
    assert_eq!(repo.count(None, ReadOptions::new()).await.unwrap(), 4);
    assert_eq!(repo.count(Some(&adults), ReadOptions::new()).await.unwrap(), 3);
    assert_eq!(
        repo.count(Some(&adults), ReadOptions::new().limit(2)).await.unwrap(),
        2
    );
    assert_eq!(
        repo.count(Some(&adults), ReadOptions::new().offset(2)).await.unwrap(),
        1
    );
}

#[tokio::test]
async fn test_truncate_clears_table() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);
    seed_users(&repo).await;

    repo.truncate(ExecOptions::new()).await.unwrap();
    assert_eq!(repo.count(None, ReadOptions::new()).await.unwrap(), 0);

    // 空表再次清空也成功
    repo.truncate(ExecOptions::new()).await.unwrap();
}

#[tokio::test]
async fn test_unknown_table_is_other_database_error() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo: Repository<Record> = Repository::new("missing_table", db.executor().unwrap());

    let err = repo.count(None, ReadOptions::new()).await.unwrap_err();
    assert_eq!(err.kind(), DatabaseErrorKind::OtherDatabaseError);
    assert!(err.cause().is_some());

    assert_eq!(repo.count(None, ReadOptions::new().no_throw()).await.unwrap(), 0);
}

// ==========================================
// 实体解码
// ==========================================

#[tokio::test]
async fn test_bool_fields_round_trip() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = flags_repo(&db).await;

    let created = repo
        .insert(
            &[Flag::new("beta", true), Flag::new("legacy", false)],
            &ColumnSelection::all(),
            ExecOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(created.len(), 2);
    assert!(created[0].active);
    assert!(!created[1].active);
    assert_eq!(created[0].archived, None);

    let active = repo
        .find(
            &[Clause::simple([("active", json!(true))])],
            &ColumnSelection::all(),
            ReadOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(active.len(), 1);
    assert_eq!(active[0].label, "beta");

    let updated = repo
        .update(
            &json!({"active": false, "archived": true}),
            &[Clause::simple([("label", json!("beta"))])],
            &ColumnSelection::all(),
            ExecOptions::new(),
        )
        .await
        .unwrap();
    assert!(!updated[0].active);
    assert_eq!(updated[0].archived, Some(true));

    let found = repo
        .find_one(
            &[Clause::simple([("label", json!("beta"))])],
            &ColumnSelection::all(),
            ExecOptions::new(),
        )
        .await
        .unwrap()
        .unwrap();
    assert!(!found.active);
    assert_eq!(repo.count(None, ReadOptions::new()).await.unwrap(), 2);
}

#[tokio::test]
async fn test_insert_whose_rows_cannot_decode_is_not_persisted() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);
    seed_users(&repo).await;

    // 别名让返回行缺少 email, 无法解码为 User
    let err = repo
        .insert(
            &[User::new("erin@example.com", "Erin", 22)],
            &ColumnSelection::all().include("id").rename("email", "login"),
            ExecOptions::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), DatabaseErrorKind::OtherDatabaseError);
    assert!(err.cause().is_some());

    assert_eq!(repo.count(None, ReadOptions::new()).await.unwrap(), 4);
    let erin = repo
        .find_one(
            &[Clause::simple([("email", json!("erin@example.com"))])],
            &ColumnSelection::all(),
            ExecOptions::new().no_throw(),
        )
        .await
        .unwrap();
    assert!(erin.is_none());
}

#[tokio::test]
async fn test_update_whose_rows_cannot_decode_is_undone() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);
    seed_users(&repo).await;

    let err = repo
        .update(
            &json!({"name": "Renamed"}),
            &[Clause::simple([("name", json!("Alice"))])],
            &ColumnSelection::all().include("id").rename("email", "login"),
            ExecOptions::new(),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), DatabaseErrorKind::OtherDatabaseError);

    let renamed = repo
        .count(
            Some(&[Clause::simple([("name", json!("Renamed"))])]),
            ReadOptions::new(),
        )
        .await
        .unwrap();
    assert_eq!(renamed, 0);
}

#[tokio::test]
async fn test_undecodable_write_inside_transaction_keeps_earlier_writes() {
    let (_temp_file, db) = create_test_db().await.expect("Failed to create test db");
    let repo = users_repo(&db);

    let tx = db.begin().await.unwrap();
    repo.insert(
        &[User::new("kept@example.com", "Kept", 1)],
        &ColumnSelection::all(),
        ExecOptions::new().in_transaction(&tx),
    )
    .await
    .unwrap();
    let err = repo
        .insert(
            &[User::new("lost@example.com", "Lost", 2)],
            &ColumnSelection::all().include("id").rename("email", "login"),
            ExecOptions::new().in_transaction(&tx),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), DatabaseErrorKind::OtherDatabaseError);
    tx.commit().await.unwrap();

    let users = repo
        .find_all(&ColumnSelection::all(), ReadOptions::new())
        .await
        .unwrap();
    assert_eq!(names(&users), vec!["Kept"]);
}
