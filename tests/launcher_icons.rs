use std::sync::Arc;

use iconforge::{
    BackgroundShape, Color, CompositeMode, Density, Draw, EntryData, Fit, IconEffect, Layer,
    LauncherIconSpec, Rect, Size, SourceStore, Surface, generate,
};
use iconforge::density::render_at;
use iconforge::generator::{ICON_SIZE, LAUNCHER_DENSITIES};

fn opaque_square(side: u32) -> Surface {
    let mut s = Surface::new(Size::new(side, side)).unwrap();
    s.fill(CompositeMode::SourceOver, Color::rgba(0.2, 0.4, 0.6, 1.0));
    s
}

fn store_with(key: &str, surface: Surface) -> SourceStore {
    let mut map = SourceStore::new();
    map.insert(key.to_owned(), Arc::new(surface));
    map
}

#[test]
fn density_multipliers_scale_base_icon_size() {
    // 512x512 opaque source, no effects, 48x48 base icon: hdpi renders
    // 72x72 and xhdpi 96x96, both fully opaque.
    let sources = store_with("src", opaque_square(512));
    let build = |mult: f64| {
        Layer::leaf(Draw::Image {
            source: "src".to_owned(),
            dst: Rect::new(0.0, 0.0, 48.0, 48.0).scaled(mult),
            fit: Fit::CenterInside,
        })
    };

    for (density, expect) in [(Density::Mdpi, 48), (Density::Hdpi, 72), (Density::Xhdpi, 96)] {
        let out = render_at(ICON_SIZE, density.multiplier(), &sources, build).unwrap();
        assert_eq!(out.size(), Size::new(expect, expect), "{density}");
        assert_eq!(out.alpha_at(0, 0), 255);
        assert_eq!(out.alpha_at(expect / 2, expect / 2), 255);
        assert_eq!(out.alpha_at(expect - 1, expect - 1), 255);
    }
}

#[test]
fn generate_emits_full_archive_in_declared_order() {
    let spec = LauncherIconSpec {
        foreground: Some("fg".to_owned()),
        name: "My App".to_owned(),
        ..Default::default()
    };
    let sources = store_with("fg", opaque_square(256));

    let assets = generate(&spec, &sources).unwrap();
    assert_eq!(assets.zip_name, "my_app.zip");

    let paths: Vec<&str> = assets.entries.iter().map(|e| e.path.as_str()).collect();
    assert_eq!(
        paths,
        vec![
            "res/mipmap-xxxhdpi/my_app.png",
            "res/mipmap-xxxhdpi/my_app_adaptive_back.png",
            "res/mipmap-xxxhdpi/my_app_adaptive_fore.png",
            "res/mipmap-xxhdpi/my_app.png",
            "res/mipmap-xxhdpi/my_app_adaptive_back.png",
            "res/mipmap-xxhdpi/my_app_adaptive_fore.png",
            "res/mipmap-xhdpi/my_app.png",
            "res/mipmap-xhdpi/my_app_adaptive_back.png",
            "res/mipmap-xhdpi/my_app_adaptive_fore.png",
            "res/mipmap-hdpi/my_app.png",
            "res/mipmap-hdpi/my_app_adaptive_back.png",
            "res/mipmap-hdpi/my_app_adaptive_fore.png",
            "res/mipmap-mdpi/my_app.png",
            "res/mipmap-mdpi/my_app_adaptive_back.png",
            "res/mipmap-mdpi/my_app_adaptive_fore.png",
            "play_store_512.png",
            "1024.png",
            "res/mipmap-anydpi-v26/my_app.xml",
        ]
    );

    // Previews come back in the declared density order with master-derived
    // sizes.
    let preview_densities: Vec<Density> = assets.previews.iter().map(|(d, _)| *d).collect();
    assert_eq!(preview_densities, LAUNCHER_DENSITIES.to_vec());
    for (density, surface) in &assets.previews {
        let side = (48.0 * density.multiplier()).round() as u32;
        assert_eq!(surface.size(), Size::new(side, side));
    }
}

#[test]
fn generated_pngs_decode_at_expected_sizes() {
    let spec = LauncherIconSpec {
        foreground: Some("fg".to_owned()),
        shape: BackgroundShape::Square,
        effect: IconEffect::Score,
        ..Default::default()
    };
    let sources = store_with("fg", opaque_square(128));
    let assets = generate(&spec, &sources).unwrap();

    let expect = [
        ("res/mipmap-xxxhdpi/ic_launcher.png", 192),
        ("res/mipmap-hdpi/ic_launcher.png", 72),
        ("res/mipmap-mdpi/ic_launcher_adaptive_back.png", 108),
        ("res/mipmap-xhdpi/ic_launcher_adaptive_fore.png", 216),
        ("play_store_512.png", 512),
        ("1024.png", 1024),
    ];
    for (path, side) in expect {
        let entry = assets
            .entries
            .iter()
            .find(|e| e.path == path)
            .unwrap_or_else(|| panic!("missing entry {path}"));
        let EntryData::Png(bytes) = &entry.data else {
            panic!("{path} is not a png entry");
        };
        let img = image::load_from_memory(bytes).unwrap();
        assert_eq!(img.width(), side, "{path}");
        assert_eq!(img.height(), side, "{path}");
    }
}

#[test]
fn adaptive_descriptor_references_both_slices() {
    let spec = LauncherIconSpec::default();
    let assets = generate(&spec, &SourceStore::new()).unwrap();

    let entry = assets
        .entries
        .iter()
        .find(|e| e.path == "res/mipmap-anydpi-v26/ic_launcher.xml")
        .expect("missing adaptive descriptor");
    let EntryData::Text(xml) = &entry.data else {
        panic!("descriptor is not a text entry");
    };
    assert_eq!(
        xml,
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n\
         <adaptive-icon xmlns:android=\"http://schemas.android.com/apk/res/android\">\n  \
         <background android:drawable=\"@mipmap/ic_launcher_adaptive_back\"/>\n  \
         <foreground android:drawable=\"@mipmap/ic_launcher_adaptive_fore\"/>\n\
         </adaptive-icon>"
    );
}

#[test]
fn missing_foreground_still_renders_background_only_icons() {
    // "No source image selected yet" is a steady state: the pass succeeds
    // and produces shaped background icons.
    let spec = LauncherIconSpec::default();
    let assets = generate(&spec, &SourceStore::new()).unwrap();

    let (_, preview) = &assets.previews[0];
    assert_eq!(preview.size(), Size::new(192, 192));
    // Circle background present at the center, clear at the corner.
    assert!(preview.alpha_at(96, 96) > 0);
    assert_eq!(preview.alpha_at(1, 1), 0);
}

#[test]
fn foreground_is_clipped_to_background_shape() {
    let spec = LauncherIconSpec {
        foreground: Some("fg".to_owned()),
        shape: BackgroundShape::Circle,
        crop: true,
        ..Default::default()
    };
    // Oversized opaque foreground: crop mode covers the whole target rect,
    // but the circle mask clips it.
    let sources = store_with("fg", opaque_square(400));
    let assets = generate(&spec, &sources).unwrap();

    let (_, preview) = &assets.previews[0]; // xxxhdpi, 192x192
    assert!(preview.alpha_at(96, 96) > 0);
    // Corners outside the circle stay transparent.
    assert_eq!(preview.alpha_at(2, 2), 0);
    assert_eq!(preview.alpha_at(189, 2), 0);
}
