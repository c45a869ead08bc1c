mod test_support;

use serde_json::json;
use test_support::{request_err, request_ok, spawn_sidecar, temp_dir};

#[test]
fn snapshot_export_restores_into_fresh_workspace() {
    let source = temp_dir("coursebook-snapshot-src");
    let target = temp_dir("coursebook-snapshot-dst");
    let out_dir = temp_dir("coursebook-snapshot-out");
    let bundle = out_dir.join("nested").join("coursebook.cbsnap.zip");

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": source.to_string_lossy() }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "auth.login",
            json!({ "email": "neha@codingblocks.com", "password": "teacher123" }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "3",
            "instructor.addClass",
            json!({ "courseId": "c102", "date": "2024-02-13", "topic": "Hooks" }),
        );
        let exported = request_ok(
            &mut stdin,
            &mut reader,
            "4",
            "workspace.exportSnapshot",
            json!({ "outPath": bundle.to_string_lossy() }),
        );
        assert_eq!(exported["bundleFormat"], "coursebook-snapshot-v1");
        assert_eq!(exported["entryCount"], 3);
        assert_eq!(exported["users"], 8);
        assert_eq!(exported["courses"], 2);
        assert!(bundle.is_file());
        drop(stdin);
        let _ = child.wait();
    }

    std::fs::write(
        target.join("coursebook.toml"),
        "[store]\nseed_fixtures = false\n",
    )
    .expect("write config");

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": target.to_string_lossy() }),
    );
    assert_eq!(selected["initialized"], true);
    let empty = request_ok(&mut stdin, &mut reader, "2", "users.teachers", json!({}));
    assert_eq!(empty["users"], json!([]));
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "3",
            "auth.login",
            json!({ "email": "neha@codingblocks.com", "password": "teacher123" }),
        ),
        "invalid_credentials"
    );

    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "workspace.importSnapshot",
        json!({ "inPath": bundle.to_string_lossy() }),
    );
    assert_eq!(imported["users"], 8);
    assert_eq!(imported["courses"], 2);
    assert_eq!(imported["route"], "login");

    let course = request_ok(
        &mut stdin,
        &mut reader,
        "5",
        "courses.get",
        json!({ "courseId": "c102" }),
    );
    let calendar = course["course"]["calendar"].as_array().expect("calendar");
    assert_eq!(calendar.len(), 2);
    assert_eq!(calendar[1]["date"], "2024-02-13");
    assert_eq!(calendar[1]["topic"], "Hooks");

    let _ = request_ok(
        &mut stdin,
        &mut reader,
        "6",
        "auth.login",
        json!({ "email": "neha@codingblocks.com", "password": "teacher123" }),
    );

    let junk = out_dir.join("junk.zip");
    std::fs::write(&junk, b"plain text").expect("write junk");
    assert_eq!(
        request_err(
            &mut stdin,
            &mut reader,
            "7",
            "workspace.importSnapshot",
            json!({ "inPath": junk.to_string_lossy() }),
        ),
        "bad_params"
    );
    // A rejected import leaves the session alone.
    let session = request_ok(&mut stdin, &mut reader, "8", "auth.session", json!({}));
    assert_eq!(session["user"]["id"], "t2");

    let _ = std::fs::remove_dir_all(source);
    let _ = std::fs::remove_dir_all(target);
    let _ = std::fs::remove_dir_all(out_dir);
}

#[test]
fn import_restores_workspace_with_unreadable_users() {
    let workspace = temp_dir("coursebook-snapshot-corrupt");
    let out_dir = temp_dir("coursebook-snapshot-corrupt-out");
    let bundle = out_dir.join("coursebook.cbsnap.zip");

    {
        let (mut child, mut stdin, mut reader) = spawn_sidecar();
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "1",
            "workspace.select",
            json!({ "path": workspace.to_string_lossy() }),
        );
        let _ = request_ok(
            &mut stdin,
            &mut reader,
            "2",
            "workspace.exportSnapshot",
            json!({ "outPath": bundle.to_string_lossy() }),
        );
        drop(stdin);
        let _ = child.wait();
    }

    {
        let conn =
            rusqlite::Connection::open(workspace.join("coursebook.sqlite3")).expect("open db");
        conn.execute(
            "UPDATE kv_store SET value = '{not json' WHERE key = 'coursebook.users'",
            [],
        )
        .expect("corrupt users");
    }

    let (_child, mut stdin, mut reader) = spawn_sidecar();
    let selected = request_ok(
        &mut stdin,
        &mut reader,
        "1",
        "workspace.select",
        json!({ "path": workspace.to_string_lossy() }),
    );
    assert_eq!(selected["initialized"], false);
    let empty = request_ok(&mut stdin, &mut reader, "2", "users.students", json!({}));
    assert_eq!(empty["users"], json!([]));

    let imported = request_ok(
        &mut stdin,
        &mut reader,
        "3",
        "workspace.importSnapshot",
        json!({ "inPath": bundle.to_string_lossy() }),
    );
    assert_eq!(imported["users"], 8);
    let login = request_ok(
        &mut stdin,
        &mut reader,
        "4",
        "auth.login",
        json!({ "email": "kabir@student.com", "password": "student123" }),
    );
    assert_eq!(login["user"]["id"], "s1");

    let _ = std::fs::remove_dir_all(workspace);
    let _ = std::fs::remove_dir_all(out_dir);
}
