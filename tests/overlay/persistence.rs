use std::time::Duration;

use filetime::FileTime;
use remapfs::overlay::TranslationFs;
use remapfs::store::Store;

use super::common::Fixture;

/// Timestamp-free view of an entry, stable across restarts.
async fn observe(fs: &TranslationFs, path: &str) -> Option<(u32, u64)> {
    fs.get_attr(path).await.ok().map(|attr| (attr.mode, attr.size))
}

#[tokio::test]
async fn cold_restart_rebuilds_an_identical_namespace() {
    let fixture = Fixture::new();
    fixture.write_file("a/one.mkv", b"one");
    fixture.write_file("a/two.mkv", b"two!");
    fixture.write_file("a/three.mkv", b"three");

    fixture.fs.add_translation("/a/one.mkv", "/shows/S1/e1.mkv").await.expect("add");
    fixture.fs.add_translation("/a/two.mkv", "/shows/S1/e2.mkv").await.expect("add");
    fixture.fs.add_translation("/a/three.mkv", "/films/f.mkv").await.expect("add");
    fixture.fs.add_translation("/a/two.mkv", "/shows/S2/e1.mkv").await.expect("re-point");
    fixture.fs.remove_translation("/a/three.mkv").await.expect("remove");

    let probes = [
        "/shows",
        "/shows/S1",
        "/shows/S1/e1.mkv",
        "/shows/S2/e1.mkv",
        "/films",
        "/a/one.mkv",
        "/a/three.mkv",
    ];
    let mut before_attrs = Vec::new();
    for path in probes {
        before_attrs.push(observe(&fixture.fs, path).await);
    }
    let before_root = fixture.fs.read_dir("/").await.expect("readdir");
    let before_shows = fixture.fs.read_dir("/shows").await.expect("readdir");
    let before_rows = fixture.fs.list_translations().await.expect("list");

    let Fixture { tempdir, fs } = fixture;
    fs.destroy().await;
    drop(fs);

    let reopened = TranslationFs::new(
        tempdir.path().join("root"),
        tempdir.path().join("table.db"),
        tempdir.path().join("backups"),
    )
    .expect("reopen overlay");

    let mut after_attrs = Vec::new();
    for path in probes {
        after_attrs.push(observe(&reopened, path).await);
    }
    assert_eq!(after_attrs, before_attrs);
    assert_eq!(reopened.read_dir("/").await.expect("readdir"), before_root);
    assert_eq!(reopened.read_dir("/shows").await.expect("readdir"), before_shows);
    assert_eq!(reopened.list_translations().await.expect("list"), before_rows);

    reopened.destroy().await;
}

#[tokio::test]
async fn external_store_edits_are_picked_up() {
    let fixture = Fixture::new();
    fixture.write_file("ext.mkv", b"external");

    // A sibling writer edits the table behind the facade's back.
    {
        let store = Store::open(&fixture.store_path()).expect("sibling connection");
        store.upsert("/ext.mkv", "/elsewhere/renamed.mkv").expect("sibling write");
    }
    // Push the file's mtime well past the watcher's last observation.
    let bumped = FileTime::from_unix_time(FileTime::now().unix_seconds() + 30, 0);
    filetime::set_file_mtime(fixture.store_path(), bumped).expect("bump mtime");

    let mut reloaded = false;
    for _ in 0..80 {
        if fixture.fs.get_attr("/elsewhere").await.is_ok() {
            reloaded = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    assert!(reloaded, "watcher should pick up the external edit within its poll window");

    let rows = fixture.fs.list_translations().await.expect("list");
    assert_eq!(rows, [("/ext.mkv".to_owned(), "/elsewhere/renamed.mkv".to_owned())]);

    fixture.shutdown().await;
}
