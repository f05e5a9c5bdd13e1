//! Tester configuration and classification tests.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::Arc,
    time::{Duration, Instant},
};

use tempfile::TempDir;

use super::{
    CdTester, DvdTester, FileTester, MediaTester, MountPolicy, TrackKind, TrackProbe,
    iso9660::image,
};
use crate::detector::{
    ActionKey, ConfigError, DeviceProperties, MediaHandle, MountRetry, Rules,
    tests::fake::{FakeSource, optical, stick},
};

fn section(text: &str) -> Rules {
    Rules::parse(text).unwrap()
}

fn configured(prototype: &dyn MediaTester, text: &str) -> Result<Box<dyn MediaTester>, ConfigError> {
    let rules = section(text);
    let mut tester = prototype.create();
    tester.load_config(rules.sections().next().unwrap())?;
    Ok(tester)
}

fn quick_retry() -> MountRetry {
    MountRetry {
        attempts: 3,
        backoff: Duration::from_millis(50),
    }
}

struct FixedTrack(TrackKind);

impl TrackProbe for FixedTrack {
    fn first_track(&self, _device: &Path) -> std::io::Result<TrackKind> {
        Ok(self.0)
    }
}

mod config {
    use super::*;

    #[test]
    fn keys_are_parsed_in_order() {
        let prototype = CdTester::with_probe(Arc::new(FixedTrack(TrackKind::Audio)));
        let tester = configured(&prototype, "[CD]\nTYPE = CD\nKEYS = @cdplayer Ok #eject\n").unwrap();
        let handle = MediaHandle::from_properties("/org/sr0", optical("/dev/sr0", ""));

        assert_eq!(
            tester.is_media(&handle).unwrap().unwrap().keys,
            [
                ActionKey::Plugin("cdplayer".to_string()),
                ActionKey::Key("Ok".to_string()),
                ActionKey::Script("eject".to_string()),
            ]
        );
    }

    #[test]
    fn empty_keys_are_rejected() {
        let result = configured(&CdTester::new(), "[CD]\nTYPE = CD\nKEYS =\n");
        assert!(matches!(result, Err(ConfigError::EmptyList { .. })));
    }

    #[test]
    fn missing_keys_are_rejected() {
        let result = configured(&DvdTester::new(), "[DVD]\nTYPE = DVD\n");
        assert!(matches!(result, Err(ConfigError::MissingKey { key, .. }) if key == "KEYS"));
    }

    #[test]
    fn invalid_action_key_is_rejected() {
        let result = configured(&DvdTester::new(), "[DVD]\nTYPE = DVD\nKEYS = @\n");
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn file_keys_are_rejected_for_cd() {
        let result = configured(&CdTester::new(), "[CD]\nTYPE = CD\nKEYS = Ok\nFILES = mp3\n");
        assert!(matches!(result, Err(ConfigError::UnknownKey { key, .. }) if key == "FILES"));
    }

    #[test]
    fn file_tester_requires_files() {
        let result = configured(&FileTester::new(quick_retry()), "[F]\nTYPE = FILE\nKEYS = Ok\n");
        assert!(matches!(result, Err(ConfigError::MissingKey { key, .. }) if key == "FILES"));
    }

    #[test]
    fn empty_suffix_is_rejected() {
        let result = configured(
            &FileTester::new(quick_retry()),
            "[F]\nTYPE = FILE\nKEYS = Ok\nFILES = mp3 \"\"\n",
        );
        assert!(matches!(result, Err(ConfigError::InvalidValue { key, .. }) if key == "FILES"));
    }

    #[test]
    fn automount_accepts_only_yes_or_no() {
        let prototype = FileTester::new(quick_retry());
        let base = "[F]\nTYPE = FILE\nKEYS = Ok\nFILES = mp3\n";

        assert!(configured(&prototype, &format!("{base}AUTOMOUNT = no\n")).is_ok());
        assert!(configured(&prototype, &format!("{base}AUTOMOUNT = YES\n")).is_ok());
        let result = configured(&prototype, &format!("{base}AUTOMOUNT = maybe\n"));
        assert!(matches!(result, Err(ConfigError::InvalidValue { key, .. }) if key == "AUTOMOUNT"));
    }

    #[test]
    fn automount_takes_one_value() {
        let result = configured(
            &FileTester::new(quick_retry()),
            "[F]\nTYPE = FILE\nKEYS = Ok\nFILES = mp3\nAUTOMOUNT = YES NO\n",
        );
        assert!(matches!(result, Err(ConfigError::MultipleValues { .. })));
    }

    #[test]
    fn mountpath_is_alias_of_linkpath() {
        let prototype = FileTester::new(quick_retry());
        let rules = section("[F]\nTYPE = FILE\nKEYS = Ok\nFILES = mp3\nMOUNTPATH = \"/video/my music\"\n");
        let mut tester = prototype.clone();
        tester.load_config(rules.sections().next().unwrap()).unwrap();

        assert_eq!(
            tester.policy(),
            MountPolicy {
                link_path: Some(PathBuf::from("/video/my music")),
                keep_mounted: true,
            }
        );
    }

    #[test]
    fn linkpath_and_mountpath_conflict() {
        let result = configured(
            &FileTester::new(quick_retry()),
            "[F]\nTYPE = FILE\nKEYS = Ok\nFILES = mp3\nLINKPATH = /a\nMOUNTPATH = /b\n",
        );
        assert!(matches!(result, Err(ConfigError::MultipleValues { .. })));
    }

    #[test]
    fn type_matching_ignores_case() {
        let tester = FileTester::new(quick_retry());
        assert!(tester.type_matches("file"));
        assert!(tester.type_matches("File"));
        assert!(!tester.type_matches("FILES"));
    }
}

mod discs {
    use super::*;

    fn cd(kind: TrackKind) -> Box<dyn MediaTester> {
        let prototype = CdTester::with_probe(Arc::new(FixedTrack(kind)));
        configured(&prototype, "[CD]\nTYPE = CD\nKEYS = PlayAudio\n").unwrap()
    }

    #[test]
    fn audio_cd_matches() {
        let handle = MediaHandle::from_properties("/org/sr0", optical("/dev/sr0", ""));
        let matched = cd(TrackKind::Audio).is_media(&handle).unwrap().unwrap();

        assert_eq!(matched.keys, [ActionKey::Key("PlayAudio".to_string())]);
        assert_eq!(matched.policy, MountPolicy::default());
    }

    #[test]
    fn data_cd_does_not_match() {
        let handle = MediaHandle::from_properties("/org/sr0", optical("/dev/sr0", "iso9660"));
        assert!(cd(TrackKind::Data).is_media(&handle).unwrap().is_none());
    }

    #[test]
    fn cd_needs_medium_in_optical_drive() {
        let mut empty = optical("/dev/sr0", "");
        empty.available = false;
        let empty = MediaHandle::from_properties("/org/sr0", empty);
        let disk = MediaHandle::from_properties("/org/sdb1", stick("/dev/sdb1"));

        assert!(cd(TrackKind::Audio).is_media(&empty).unwrap().is_none());
        assert!(cd(TrackKind::Audio).is_media(&disk).unwrap().is_none());
    }

    fn dvd_handle(dir: &TempDir, content: &[u8], fs_type: &str) -> MediaHandle {
        let device = dir.path().join("sr0.iso");
        fs::write(&device, content).unwrap();
        let device = device.to_string_lossy().into_owned();
        MediaHandle::from_properties("/org/sr0", optical(&device, fs_type))
    }

    fn dvd() -> Box<dyn MediaTester> {
        configured(&DvdTester::new(), "[DVD]\nTYPE = DVD\nKEYS = @dvd\n").unwrap()
    }

    #[test]
    fn video_dvd_image_matches() {
        let dir = TempDir::new().unwrap();
        let handle = dvd_handle(&dir, &image::with_video_ts(b"DVDVIDEO-VMG\0\0\0"), "udf");

        let matched = dvd().is_media(&handle).unwrap().unwrap();

        assert_eq!(matched.keys, [ActionKey::Plugin("dvd".to_string())]);
    }

    #[test]
    fn data_disc_is_not_a_dvd() {
        let dir = TempDir::new().unwrap();
        let handle = dvd_handle(&dir, &image::with_video_ts(b"NOT A DVD AT ALL"), "iso9660");

        assert!(dvd().is_media(&handle).unwrap().is_none());
    }

    #[test]
    fn unreadable_filesystem_type_is_skipped() {
        let dir = TempDir::new().unwrap();
        let handle = dvd_handle(&dir, &image::with_video_ts(b"DVDVIDEO-VMG"), "vfat");

        assert!(dvd().is_media(&handle).unwrap().is_none());
    }

    #[test]
    fn unopenable_device_is_an_error() {
        let handle = MediaHandle::from_properties("/org/sr9", optical("/nonexistent/sr9", ""));
        assert!(dvd().is_media(&handle).is_err());
    }
}

mod files {
    use super::*;

    struct Fixture {
        _dir: TempDir,
        mount_point: PathBuf,
        links: PathBuf,
        source: FakeSource,
        prototype: FileTester,
    }

    fn fixture(files: &[&str]) -> Fixture {
        let dir = TempDir::new().unwrap();
        let mount_point = dir.path().join("media");
        let links = dir.path().join("links");
        fs::create_dir_all(&links).unwrap();
        for file in files {
            let path = mount_point.join(file);
            fs::create_dir_all(path.parent().unwrap()).unwrap();
            fs::write(path, b"").unwrap();
        }

        let source = FakeSource::default();
        source.add_device("/org/sdb1", stick("/dev/sdb1"));
        source.add_filesystem("/org/sdb1", &mount_point.to_string_lossy());

        Fixture {
            _dir: dir,
            mount_point,
            links,
            source,
            prototype: FileTester::new(quick_retry()),
        }
    }

    fn handle(source: &FakeSource) -> MediaHandle {
        let props: DeviceProperties = source.state().devices["/org/sdb1"].clone();
        MediaHandle::from_properties("/org/sdb1", props)
    }

    #[tokio::test]
    async fn matching_suffix_is_case_sensitive() {
        let fx = fixture(&["a.mp3", "b.txt", "c.JPG"]);
        let music = configured(&fx.prototype, "[M]\nTYPE = FILE\nKEYS = Music\nFILES = mp3 jpg\n").unwrap();
        let photos = configured(&fx.prototype, "[P]\nTYPE = FILE\nKEYS = Photos\nFILES = jpg\n").unwrap();
        let mut prototype = fx.prototype.clone();
        let mut handle = handle(&fx.source);

        prototype.start_scan(&mut handle, &fx.source).await.unwrap();

        assert!(music.is_media(&handle).unwrap().is_some());
        assert!(photos.is_media(&handle).unwrap().is_none());
        assert_eq!(handle.mount_path().map(PathBuf::from), Some(fx.mount_point.clone()));
    }

    #[tokio::test]
    async fn query_has_no_side_effects() {
        let fx = fixture(&["a.mp3"]);
        let music = configured(&fx.prototype, "[M]\nTYPE = FILE\nKEYS = Music\nFILES = mp3\n").unwrap();
        let mut prototype = fx.prototype.clone();
        let mut handle = handle(&fx.source);
        prototype.start_scan(&mut handle, &fx.source).await.unwrap();

        let first = music.is_media(&handle).unwrap();
        let second = music.is_media(&handle).unwrap();

        assert_eq!(first, second);
        assert!(first.is_some());
    }

    #[tokio::test]
    async fn files_without_suffix_never_match() {
        let fx = fixture(&["README", "docs/LICENSE"]);
        let music = configured(&fx.prototype, "[M]\nTYPE = FILE\nKEYS = Music\nFILES = mp3\n").unwrap();
        let mut prototype = fx.prototype.clone();
        let mut handle = handle(&fx.source);

        prototype.start_scan(&mut handle, &fx.source).await.unwrap();

        let state = fx.prototype.shared_state();
        assert!(state.lock().unwrap().detected_suffixes().contains(""));
        assert!(music.is_media(&handle).unwrap().is_none());
    }

    #[tokio::test]
    async fn exhausted_mount_retries_give_no_match() {
        let fx = fixture(&["a.mp3"]);
        fx.source.state().mount_returns_nothing = true;
        let music = configured(&fx.prototype, "[M]\nTYPE = FILE\nKEYS = Music\nFILES = mp3\n").unwrap();
        let mut prototype = fx.prototype.clone();
        let mut handle = handle(&fx.source);
        let started = Instant::now();

        let result = prototype.start_scan(&mut handle, &fx.source).await;

        assert!(result.is_err());
        assert_eq!(fx.source.calls("mount "), 3);
        assert!(started.elapsed() >= Duration::from_millis(100));
        assert!(music.is_media(&handle).unwrap().is_none());

        prototype
            .end_scan(&mut handle, &fx.source, &MountPolicy::default())
            .await
            .unwrap();
        assert_eq!(fx.prototype.shared_state().lock().unwrap().tracked_count(), 0);
    }

    #[tokio::test]
    async fn end_scan_links_unmounts_and_tracks() {
        let fx = fixture(&["a.mp3"]);
        let music = configured(&fx.prototype, "[M]\nTYPE = FILE\nKEYS = Music\nFILES = mp3\n").unwrap();
        let mut prototype = fx.prototype.clone();
        let mut handle = handle(&fx.source);
        let link = fx.links.join("usb");
        prototype.start_scan(&mut handle, &fx.source).await.unwrap();
        assert!(music.is_media(&handle).unwrap().is_some());

        let policy = MountPolicy {
            link_path: Some(link.clone()),
            keep_mounted: false,
        };
        prototype.end_scan(&mut handle, &fx.source, &policy).await.unwrap();

        assert_eq!(fs::read_link(&link).unwrap(), fx.mount_point);
        assert!(!fx.source.is_mounted_now("/org/sdb1"));
        assert!(!handle.is_auto_mounted());
        let state = fx.prototype.shared_state();
        let tracked = state.lock().unwrap().tracked("/dev/sdb1").cloned().unwrap();
        assert_eq!(tracked.dev_path, "/org/sdb1");
        assert_eq!(tracked.link_path, Some(link.clone()));

        prototype.remove_device(&handle).await.unwrap();

        assert!(fs::symlink_metadata(&link).is_err());
        assert_eq!(state.lock().unwrap().tracked_count(), 0);
    }

    #[tokio::test]
    async fn tracked_device_is_not_scanned_again() {
        let fx = fixture(&["a.mp3"]);
        let music = configured(&fx.prototype, "[M]\nTYPE = FILE\nKEYS = Music\nFILES = mp3\n").unwrap();
        let mut prototype = fx.prototype.clone();
        let mut handle = handle(&fx.source);
        prototype.start_scan(&mut handle, &fx.source).await.unwrap();
        prototype
            .end_scan(&mut handle, &fx.source, &MountPolicy::default())
            .await
            .unwrap();

        let mut again = self::handle(&fx.source);
        prototype.start_scan(&mut again, &fx.source).await.unwrap();

        assert_eq!(fx.source.calls("mount "), 1);
        assert!(music.is_media(&again).unwrap().is_none());
    }

    #[tokio::test]
    async fn unavailable_device_is_forgotten() {
        let fx = fixture(&["a.mp3"]);
        let mut prototype = fx.prototype.clone();
        let mut handle = handle(&fx.source);
        prototype.start_scan(&mut handle, &fx.source).await.unwrap();
        prototype
            .end_scan(&mut handle, &fx.source, &MountPolicy::default())
            .await
            .unwrap();

        fx.source.set_available("/org/sdb1", false);
        let mut ejected = self::handle(&fx.source);
        prototype.start_scan(&mut ejected, &fx.source).await.unwrap();

        assert_eq!(fx.prototype.shared_state().lock().unwrap().tracked_count(), 0);
    }

    #[tokio::test]
    async fn device_without_filesystem_is_not_an_error() {
        let source = FakeSource::default();
        source.add_device("/org/sr0", optical("/dev/sr0", ""));
        let mut prototype = FileTester::new(quick_retry());
        let mut handle = MediaHandle::from_properties("/org/sr0", optical("/dev/sr0", ""));

        prototype.start_scan(&mut handle, &source).await.unwrap();
        prototype
            .end_scan(&mut handle, &source, &MountPolicy::default())
            .await
            .unwrap();

        assert!(!handle.is_auto_mounted());
        assert_eq!(source.calls("mount "), 0);
        assert_eq!(prototype.shared_state().lock().unwrap().tracked_count(), 0);
    }

    #[tokio::test]
    async fn link_failure_still_tracks_device() {
        let fx = fixture(&["a.mp3"]);
        let mut prototype = fx.prototype.clone();
        let mut handle = handle(&fx.source);
        let occupied = fx.links.join("usb");
        fs::write(&occupied, b"keep").unwrap();
        prototype.start_scan(&mut handle, &fx.source).await.unwrap();

        let policy = MountPolicy {
            link_path: Some(occupied.clone()),
            keep_mounted: true,
        };
        prototype.end_scan(&mut handle, &fx.source, &policy).await.unwrap();

        assert_eq!(fs::read(&occupied).unwrap(), b"keep");
        let state = fx.prototype.shared_state();
        let tracked = state.lock().unwrap().tracked("/dev/sdb1").cloned().unwrap();
        assert_eq!(tracked.dev_path, "/org/sdb1");
        assert_eq!(tracked.link_path, None);
    }

    #[test]
    fn instances_share_state_with_prototype() {
        let prototype = FileTester::new(quick_retry());
        let _instance = prototype.create();

        assert_eq!(Arc::strong_count(&prototype.shared_state()), 3);
    }
}
