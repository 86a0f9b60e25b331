use super::common::Fixture;
use remapfs::overlay::Error;

#[tokio::test]
async fn listing_hides_originals_and_keeps_neighbours() {
    let fixture = Fixture::new();
    fixture.write_file("a/b/orig.mkv", b"payload");
    fixture.write_file("a/b/keep.txt", b"kept");

    fixture.fs.add_translation("/a/b/orig.mkv", "/shows/S/E.mkv").await.expect("add");

    let listing = fixture.fs.read_dir("/a/b").await.expect("readdir");
    assert!(listing.contains(&"keep.txt".to_owned()));
    assert!(!listing.contains(&"orig.mkv".to_owned()), "original must be hidden");

    fixture.shutdown().await;
}

#[tokio::test]
async fn listing_descends_the_virtual_chain() {
    let fixture = Fixture::new();
    fixture.write_file("a/b/orig.mkv", b"payload");

    fixture.fs.add_translation("/a/b/orig.mkv", "/shows/S/E.mkv").await.expect("add");

    let root = fixture.fs.read_dir("/").await.expect("readdir root");
    assert!(root.contains(&"a".to_owned()));
    assert!(root.contains(&"shows".to_owned()));

    let shows = fixture.fs.read_dir("/shows").await.expect("readdir virtual");
    assert!(shows.contains(&"S".to_owned()));

    let season = fixture.fs.read_dir("/shows/S").await.expect("readdir leaf dir");
    assert!(season.contains(&"E.mkv".to_owned()));

    fixture.shutdown().await;
}

#[tokio::test]
async fn listing_always_carries_dots_and_compat_names() {
    let fixture = Fixture::new();
    fixture.create_dir("plain");

    let listing = fixture.fs.read_dir("/plain").await.expect("readdir");
    assert_eq!(&listing[..2], [".".to_owned(), "..".to_owned()]);
    for name in [".grab", ".plexmatch", ".plexignore"] {
        assert!(listing.contains(&name.to_owned()), "missing {name}");
    }

    fixture.shutdown().await;
}

#[tokio::test]
async fn listing_deduplicates_backing_and_virtual_names() {
    let fixture = Fixture::new();
    fixture.write_file("shows/existing.txt", b"x");
    fixture.write_file("a/orig.mkv", b"payload");

    fixture.fs.add_translation("/a/orig.mkv", "/shows/E.mkv").await.expect("add");

    let root = fixture.fs.read_dir("/").await.expect("readdir root");
    let count = root.iter().filter(|name| name.as_str() == "shows").count();
    assert_eq!(count, 1, "physical dir and virtual dir share one entry");

    let tail = &root[2..];
    let mut sorted = tail.to_vec();
    sorted.sort();
    assert_eq!(tail, sorted.as_slice(), "entries after the dots are sorted");

    fixture.shutdown().await;
}

#[tokio::test]
async fn virtual_listing_ignores_backing_contents() {
    let fixture = Fixture::new();
    fixture.write_file("shows/physical.txt", b"x");
    fixture.write_file("a/orig.mkv", b"payload");

    fixture.fs.add_translation("/a/orig.mkv", "/shows/E.mkv").await.expect("add");

    // "/shows" is a virtual directory now, so the synthesized view wins.
    let listing = fixture.fs.read_dir("/shows").await.expect("readdir");
    assert!(listing.contains(&"E.mkv".to_owned()));
    assert!(!listing.contains(&"physical.txt".to_owned()));

    fixture.shutdown().await;
}

#[tokio::test]
async fn shadowed_directory_refuses_listing() {
    let fixture = Fixture::new();
    fixture.write_file("a/dir/inner.txt", b"x");

    fixture.fs.add_translation("/a/dir", "/d").await.expect("add");

    assert_eq!(fixture.fs.read_dir("/a/dir").await, Err(Error::NoEntry));

    let translated = fixture.fs.read_dir("/d").await.expect("translated side lists");
    assert!(translated.contains(&"inner.txt".to_owned()));

    fixture.shutdown().await;
}
