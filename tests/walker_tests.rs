#[cfg(test)]
mod walker_tests {
    use chrono::NaiveDate;
    use insta::assert_snapshot;
    use rusqlite::Connection;
    use resultwalk::core::db::mock::{CellValue, ScriptedCell, ScriptedResultSet, ScriptedStatement};
    use resultwalk::core::db::quirks::CHAR_TO_SMALLINT_MESSAGE;
    use resultwalk::core::db::{
        normalize, resolve, ColumnDescriptor, DriverError, IdentifierCase, QuirkTable,
        RenderedOutcome, ResultCursor, ResultWalker, SqliteStatement, Statement, Transcript, Value,
        Warning,
    };
    use resultwalk::core::WalkError;

    fn setup_people(conn: &Connection) {
        conn.execute_batch(
            "
            CREATE TABLE people (
                id INTEGER PRIMARY KEY,
                name TEXT,
                joined_at TIMESTAMP,
                born_on DATE,
                avatar BLOB
            );
            INSERT INTO people (name, joined_at, born_on, avatar)
                VALUES ('Alice', '2023-06-01 09:15:00.125', '1990-01-31', X'89504E47');
            INSERT INTO people (name, joined_at, born_on, avatar)
                VALUES (NULL, NULL, NULL, NULL);
        ",
        )
        .unwrap();
    }

    #[test]
    fn test_select_literal_values() {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = SqliteStatement::new(&conn, "select 1 as a, 'x' as b");

        let transcript = ResultWalker::new(QuirkTable::sqlite())
            .execute(&mut stmt, None)
            .unwrap();

        assert_eq!(transcript.outcomes.len(), 1);
        assert_eq!(transcript.render(), "a\tb\n1\tx\n1 row(s) affected");
    }

    #[test]
    fn test_update_reports_affected_rows_only() {
        let conn = Connection::open_in_memory().unwrap();
        setup_people(&conn);
        let mut stmt = SqliteStatement::new(&conn, "UPDATE people SET name = 'Zed'");

        let transcript = ResultWalker::new(QuirkTable::sqlite())
            .execute(&mut stmt, None)
            .unwrap();

        assert_eq!(transcript.outcomes, vec![RenderedOutcome::UpdateCount { count: 2 }]);
        assert_eq!(transcript.render(), "2 row(s) affected");
    }

    #[test]
    fn test_script_outcomes_in_order() {
        let conn = Connection::open_in_memory().unwrap();
        setup_people(&conn);
        let mut stmt = SqliteStatement::new(
            &conn,
            "SELECT id, name FROM people ORDER BY id;
             UPDATE people SET name = 'Bob' WHERE id = 2;
             SELECT count(*) AS n FROM people WHERE name = 'Bob';
             DELETE FROM people WHERE id = 99;",
        );

        let transcript = ResultWalker::new(QuirkTable::sqlite())
            .with_separator(" | ")
            .execute(&mut stmt, None)
            .unwrap();

        assert_snapshot!(transcript.render(), @r###"
        id | name
        1 | Alice
        2 | NULL
        2 row(s) affected
        1 row(s) affected
        n
        1
        1 row(s) affected
        0 row(s) affected
        "###);
    }

    #[test]
    fn test_sqlite_dates_and_blobs_are_normalized() {
        let conn = Connection::open_in_memory().unwrap();
        setup_people(&conn);
        let mut stmt =
            SqliteStatement::new(&conn, "SELECT joined_at, born_on, avatar FROM people ORDER BY id");
        stmt.execute(None).unwrap();
        let quirks = QuirkTable::sqlite();

        let mut cursor = stmt.result_set().unwrap();
        assert!(cursor.advance().unwrap());
        let joined = normalize(cursor.as_ref(), 1, &quirks).unwrap();
        let born = normalize(cursor.as_ref(), 2, &quirks).unwrap();
        let avatar = normalize(cursor.as_ref(), 3, &quirks).unwrap();

        assert_eq!(
            joined,
            Value::Timestamp(
                NaiveDate::from_ymd_opt(2023, 6, 1)
                    .unwrap()
                    .and_hms_milli_opt(9, 15, 0, 125)
                    .unwrap()
            )
        );
        assert_eq!(born, Value::Date(NaiveDate::from_ymd_opt(1990, 1, 31).unwrap()));
        assert_eq!(avatar, Value::Bytes(vec![0x89, 0x50, 0x4E, 0x47]));

        assert!(cursor.advance().unwrap());
        assert!(normalize(cursor.as_ref(), 1, &quirks).unwrap().is_null());
        assert!(!cursor.advance().unwrap());
        cursor.close().unwrap();
        // Values stay usable after the cursor is gone
        drop(cursor);
        assert_eq!(avatar.to_string(), "<BLOB: 4 bytes>");
    }

    #[test]
    fn test_resolve_on_sqlite_row() {
        let conn = Connection::open_in_memory().unwrap();
        setup_people(&conn);
        let mut stmt = SqliteStatement::new(
            &conn,
            "SELECT id AS UserId, name AS UserName FROM people WHERE id = 1",
        );
        stmt.execute(None).unwrap();

        let mut cursor = stmt.result_set().unwrap();
        cursor.advance().unwrap();
        let name = resolve(cursor.as_ref(), "username", |n| IdentifierCase::Preserve.correct(n));
        assert_eq!(name.unwrap().as_deref(), Some("Alice"));
        let id = resolve(cursor.as_ref(), "userid", |n| IdentifierCase::Upper.correct(n));
        assert_eq!(id.unwrap().as_deref(), Some("1"));
        let missing = resolve(cursor.as_ref(), "email", |n| n.to_string());
        assert_eq!(missing.unwrap(), None);
    }

    #[test]
    fn test_execution_error_from_sqlite() {
        let conn = Connection::open_in_memory().unwrap();
        let mut stmt = SqliteStatement::new(&conn, "SELECT * FROM nonexistent_table");

        let err = ResultWalker::default()
            .execute(&mut stmt, None)
            .unwrap_err();
        match err {
            WalkError::Execution(e) => assert!(e.message.contains("no such table")),
            other => panic!("Expected Execution error, got {:?}", other),
        }
    }

    #[test]
    fn test_later_statement_failure_keeps_earlier_outcomes() {
        let conn = Connection::open_in_memory().unwrap();
        setup_people(&conn);
        let mut stmt = SqliteStatement::new(
            &conn,
            "UPDATE people SET name = 'Carol' WHERE id = 1;
             SELECT name FROM people WHERE id = 1;
             SELECT * FROM missing;",
        );
        let mut transcript = Transcript::new();

        let err = ResultWalker::new(QuirkTable::sqlite())
            .walk(&mut stmt, None, &mut transcript)
            .unwrap_err();

        match err {
            WalkError::Driver(e) => assert!(e.message.contains("no such table")),
            other => panic!("Expected Driver error, got {:?}", other),
        }
        assert_eq!(
            transcript.render(),
            "1 row(s) affected\nname\nCarol\n1 row(s) affected"
        );
    }

    #[test]
    fn test_loosely_typed_temporal_text_is_kept() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "
            CREATE TABLE readings (taken_on DATE, taken_at TIMESTAMP);
            INSERT INTO readings VALUES ('2024-03-01 10:00:00', 'n/a');
            INSERT INTO readings VALUES ('2024-03-02', '2024-03-02 08:30:00');
        ",
        )
        .unwrap();
        let mut stmt = SqliteStatement::new(&conn, "SELECT taken_on, taken_at FROM readings");

        let transcript = ResultWalker::new(QuirkTable::sqlite())
            .execute(&mut stmt, None)
            .unwrap();

        assert_eq!(
            transcript.render(),
            "taken_on\ttaken_at\n\
             2024-03-01 10:00:00\tn/a\n\
             2024-03-02\t2024-03-02 08:30:00\n\
             2 row(s) affected"
        );
    }

    #[test]
    fn test_char_to_smallint_failure_on_third_column() {
        let columns = vec![
            ColumnDescriptor::new(1, "TABLE_NAME", Some("VARCHAR")),
            ColumnDescriptor::new(2, "ORDINAL", Some("INT")),
            ColumnDescriptor::new(3, "NULLABLE", Some("SMALLINT")),
        ];
        let mut stmt = ScriptedStatement::new().then_result_set(
            ScriptedResultSet::with_columns(columns).row([
                ScriptedCell::new(CellValue::Text("orders".into())),
                ScriptedCell::new(CellValue::Integer(1)),
                ScriptedCell::failing(DriverError::new(CHAR_TO_SMALLINT_MESSAGE)).text("YES"),
            ]),
        );

        let transcript = ResultWalker::new(QuirkTable::sql_server())
            .execute(&mut stmt, Some("exec sp_columns orders"))
            .unwrap();

        assert_eq!(
            transcript.render(),
            "TABLE_NAME\tORDINAL\tNULLABLE\norders\t1\tYES\n1 row(s) affected"
        );
    }

    #[test]
    fn test_procedure_with_interleaved_outcomes_and_warnings() {
        let ts = NaiveDate::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(3, 4, 5)
            .unwrap();
        let mut stmt = ScriptedStatement::new()
            .then_update_count(3)
            .then_result_set(
                ScriptedResultSet::with_columns(vec![ColumnDescriptor::new(
                    1,
                    "CREATED",
                    Some("oracle.sql.TIMESTAMP"),
                )])
                .row([ScriptedCell::new(CellValue::Vendor {
                    type_name: "oracle.sql.TIMESTAMP".into(),
                    text: "02-JAN-24 03.04.05".into(),
                })
                .timestamp(ts)]),
            )
            .then_result_set(ScriptedResultSet::new(&["EMPTY"]))
            .then_update_count(0)
            .warning_at(0, Warning::new("starting batch"))
            .warning_at(
                3,
                Warning::new("row count may be stale")
                    .with_code(17)
                    .with_sql_state("01000")
                    .chain(Warning::new("done")),
            );

        let transcript = ResultWalker::new(QuirkTable::oracle())
            .execute(&mut stmt, None)
            .unwrap();

        assert_eq!(
            transcript.render(),
            "3 row(s) affected\n\
             CREATED\n2024-01-02 03:04:05\n1 row(s) affected\n\
             EMPTY\n0 row(s) affected\n\
             0 row(s) affected"
        );
        assert_eq!(transcript.notices.len(), 3);
        assert_eq!(stmt.closed_result_sets(), 2);
    }

    #[test]
    fn test_transcript_json_export() {
        let mut stmt = ScriptedStatement::new()
            .then_result_set(ScriptedResultSet::new(&["a"]).row([CellValue::Integer(1)]))
            .warning_at(0, Warning::new("hi"));
        let transcript = ResultWalker::default().execute(&mut stmt, None).unwrap();

        let json: serde_json::Value = serde_json::from_str(&transcript.to_json().unwrap()).unwrap();
        assert_eq!(json["outcomes"][0]["kind"], "table");
        assert_eq!(json["outcomes"][0]["rows"][0], "1");
        assert_eq!(json["notices"][0]["kind"], "output");
        assert_eq!(json["notices"][0]["message"], "hi");
    }
}
