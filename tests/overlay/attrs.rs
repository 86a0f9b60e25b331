use super::common::Fixture;
use remapfs::overlay::Error;

#[tokio::test]
async fn add_and_stat_synthesizes_the_virtual_chain() {
    let fixture = Fixture::new();
    fixture.write_file("a/b/orig.mkv", b"payload");

    fixture.fs.add_translation("/a/b/orig.mkv", "/shows/S/E.mkv").await.expect("add succeeds");

    let shows = fixture.fs.get_attr("/shows").await.expect("virtual dir attr");
    assert!(shows.is_dir());
    assert_eq!(shows.mode & 0o777, 0o755);
    assert_eq!(shows.nlink, 2);

    let season = fixture.fs.get_attr("/shows/S").await.expect("virtual dir attr");
    assert!(season.is_dir());

    let episode = fixture.fs.get_attr("/shows/S/E.mkv").await.expect("backing attr");
    assert!(!episode.is_dir());
    assert_eq!(episode.size, 7);

    fixture.shutdown().await;
}

#[tokio::test]
async fn translated_original_is_hidden() {
    let fixture = Fixture::new();
    fixture.write_file("a/b/orig.mkv", b"payload");

    fixture.fs.add_translation("/a/b/orig.mkv", "/shows/S/E.mkv").await.expect("add");

    assert_eq!(fixture.fs.get_attr("/a/b/orig.mkv").await, Err(Error::NoEntry));
    assert_eq!(fixture.fs.access("/a/b/orig.mkv", libc::F_OK).await, Err(Error::NoEntry));

    fixture.shutdown().await;
}

#[tokio::test]
async fn paths_under_a_translated_original_are_hidden_too() {
    let fixture = Fixture::new();
    fixture.write_file("a/dir/inner.txt", b"x");

    fixture.fs.add_translation("/a/dir", "/d").await.expect("add");

    assert_eq!(fixture.fs.get_attr("/a/dir/inner.txt").await, Err(Error::NoEntry));
    assert!(fixture.fs.get_attr("/d/inner.txt").await.is_ok(), "translated side stays reachable");

    fixture.shutdown().await;
}

#[tokio::test]
async fn passthrough_paths_stat_the_backing_tree() {
    let fixture = Fixture::new();
    fixture.write_file("plain.txt", b"abc");

    let attr = fixture.fs.get_attr("/plain.txt").await.expect("plain stat");
    assert_eq!(attr.size, 3);
    assert_eq!(fixture.fs.get_attr("/absent").await, Err(Error::NoEntry));

    fixture.shutdown().await;
}

#[tokio::test]
async fn compat_entries_are_synthesized_everywhere() {
    let fixture = Fixture::new();

    for path in ["/anything/.plexmatch", "/deep/nested/.plexignore", "/x/.grab"] {
        let attr = fixture.fs.get_attr(path).await.expect("compat attr");
        assert!(!attr.is_dir());
        assert_eq!(attr.size, 0);
        assert_eq!(attr.mode & 0o777, 0o644);
        fixture.fs.access(path, libc::R_OK).await.expect("compat access");
    }

    fixture.shutdown().await;
}

#[tokio::test]
async fn access_follows_the_backing_permissions() {
    let fixture = Fixture::new();
    fixture.write_file("file.txt", b"data");

    fixture.fs.access("/file.txt", libc::R_OK).await.expect("readable");
    assert_eq!(fixture.fs.access("/missing", libc::F_OK).await, Err(Error::NoEntry));

    fixture.fs.add_translation("/file.txt", "/v/dir/file.txt").await.expect("add");
    fixture.fs.access("/v/dir", libc::W_OK).await.expect("virtual dirs always pass");

    fixture.shutdown().await;
}
