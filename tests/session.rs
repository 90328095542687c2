use std::io::{Cursor, Read, Write};

use image::{ImageFormat, Luma, Rgba, RgbaImage};
use mask_label::archive::{self, IMAGE_ENTRY, LABEL_ENTRY};
use mask_label::render::{DisplayList, DrawCmd, RasterSurface, Renderer};
use mask_label::{CanvasSession, Dims, InputEvent, LoadedImage, Outcome, Point};
use zip::write::SimpleFileOptions;
use zip::{ZipArchive, ZipWriter};

fn loaded(width: u32, height: u32) -> LoadedImage {
    LoadedImage {
        name: "photo.png".to_string(),
        pixels: RgbaImage::from_pixel(width, height, Rgba([200, 200, 200, 255])),
    }
}

fn commit(
    session: &mut CanvasSession,
    list: &mut DisplayList,
    points: &[[f64; 2]],
    label: &str,
) -> Outcome {
    session.handle(InputEvent::PointerDown(points[0].into()), list);
    for &p in &points[1..] {
        session.handle(InputEvent::PointerMove(p.into()), list);
    }
    session.handle(InputEvent::PointerUp, list);
    session
        .handle(InputEvent::ConfirmLabel(label.to_string()), list)
        .expect("commit outcome")
}

fn outline_of(list: &DisplayList, index: usize) -> Vec<Point> {
    list.commands()
        .iter()
        .filter_map(|cmd| match cmd {
            DrawCmd::ClosedPath { outline, .. } => Some(outline.clone()),
            _ => None,
        })
        .nth(index)
        .expect("closed path")
}

#[test]
fn stored_points_survive_resize() {
    let mut list = DisplayList::new();
    let mut session = CanvasSession::new(
        loaded(400, 200),
        Dims::new(200.0, 100.0),
        Renderer::default(),
        10.0,
        &mut list,
    );
    commit(
        &mut session,
        &mut list,
        &[[20.0, 20.0], [120.0, 30.0], [60.0, 80.0]],
        "field",
    );
    let stored: Vec<Point> = session
        .store()
        .iter()
        .next()
        .unwrap()
        .1
        .points()
        .to_vec();
    let at_a = outline_of(&list, 0);

    session.handle(InputEvent::Resize(Dims::new(300.0, 150.0)), &mut list);
    let at_b = outline_of(&list, 0);

    let stored_after: Vec<Point> = session
        .store()
        .iter()
        .next()
        .unwrap()
        .1
        .points()
        .to_vec();
    assert_eq!(stored, stored_after);
    for (a, b) in at_a.iter().zip(&at_b) {
        assert!((b.x - a.x * 1.5).abs() < 1e-9);
        assert!((b.y - a.y * 1.5).abs() < 1e-9);
    }
}

#[test]
fn eraser_removes_by_identity() {
    let mut list = DisplayList::new();
    let mut session = CanvasSession::new(
        loaded(100, 100),
        Dims::new(100.0, 100.0),
        Renderer::default(),
        10.0,
        &mut list,
    );
    let shape = [[10.0, 10.0], [40.0, 10.0], [40.0, 40.0]];
    let Outcome::Committed { id: first, .. } = commit(&mut session, &mut list, &shape, "cat")
    else {
        panic!("first commit");
    };
    let Outcome::Committed { id: second, .. } = commit(&mut session, &mut list, &shape, "dog")
    else {
        panic!("second commit");
    };
    assert_ne!(first, second);

    session.handle(InputEvent::SetEraser(true), &mut list);
    let outcome = session.handle(InputEvent::PointerDown(Point::new(39.0, 39.0)), &mut list);
    let Some(Outcome::Erased(removed)) = outcome else {
        panic!("expected erase, got {:?}", outcome);
    };
    // both share the vertex in range, so both go, each reported once
    let labels: Vec<_> = removed.iter().map(|(_, a)| a.label()).collect();
    assert_eq!(labels, ["cat", "dog"]);
    assert!(session.store().is_empty());

    session.handle(InputEvent::SetEraser(false), &mut list);
    let Outcome::Committed { id: third, .. } = commit(&mut session, &mut list, &shape, "cat")
    else {
        panic!("third commit");
    };
    let far = [[70.0, 70.0], [90.0, 70.0], [90.0, 90.0]];
    commit(&mut session, &mut list, &far, "cat");
    session.handle(InputEvent::SetEraser(true), &mut list);
    let outcome = session.handle(InputEvent::PointerDown(Point::new(90.0, 91.0)), &mut list);
    let Some(Outcome::Erased(removed)) = outcome else {
        panic!("expected erase, got {:?}", outcome);
    };
    assert_eq!(removed.len(), 1);
    assert_ne!(removed[0].0, third);
    assert!(session.store().get(third).is_some());
}

#[test]
fn empty_label_is_not_committed() {
    let mut list = DisplayList::new();
    let mut session = CanvasSession::new(
        loaded(50, 50),
        Dims::new(50.0, 50.0),
        Renderer::default(),
        10.0,
        &mut list,
    );
    let outcome = commit(&mut session, &mut list, &[[1.0, 1.0], [20.0, 5.0]], "");
    assert!(matches!(outcome, Outcome::LabelRejected(_)));
    assert!(session.store().is_empty());
    assert!(session.is_prompting());
}

#[test]
fn mask_matches_committed_triangle() {
    let mut list = DisplayList::new();
    // display at half size: the stroke is drawn at half scale
    let mut session = CanvasSession::new(
        loaded(100, 50),
        Dims::new(50.0, 25.0),
        Renderer::default(),
        10.0,
        &mut list,
    );
    commit(
        &mut session,
        &mut list,
        &[[5.0, 5.0], [45.0, 5.0], [45.0, 20.0]],
        "tri",
    );

    let mask = session.rasterize_mask();
    assert_eq!(mask.dimensions(), (100, 50));
    assert_eq!(*mask.get_pixel(50, 20), Luma([255]));
    assert_eq!(*mask.get_pixel(5, 5), Luma([0]));
    assert_eq!(mask, session.rasterize_mask());
}

#[test]
fn empty_session_exports_black_mask() {
    let mut surface = RasterSurface::new();
    let session = CanvasSession::new(
        loaded(100, 50),
        Dims::new(100.0, 50.0),
        Renderer::default(),
        10.0,
        &mut surface,
    );
    let mask = session.rasterize_mask();
    assert_eq!(mask.dimensions(), (100, 50));
    assert!(mask.pixels().all(|p| *p == Luma([0])));
    assert_eq!(surface.pixels().dimensions(), (100, 50));
}

#[test]
fn export_bundle_round_trip() {
    let mut list = DisplayList::new();
    let mut session = CanvasSession::new(
        loaded(60, 40),
        Dims::new(60.0, 40.0),
        Renderer::default(),
        10.0,
        &mut list,
    );
    commit(
        &mut session,
        &mut list,
        &[[0.0, 0.0], [30.0, 0.0], [30.0, 20.0], [0.0, 20.0]],
        "box",
    );

    let bytes = session.export().unwrap();
    let mut zip = ZipArchive::new(Cursor::new(bytes)).unwrap();
    assert_eq!(zip.len(), 2);
    let mut names: Vec<_> = zip.file_names().map(str::to_string).collect();
    names.sort();
    assert_eq!(names, [IMAGE_ENTRY, LABEL_ENTRY]);

    let mut data = Vec::new();
    zip.by_name(LABEL_ENTRY)
        .unwrap()
        .read_to_end(&mut data)
        .unwrap();
    let label = image::load_from_memory_with_format(&data, ImageFormat::Png)
        .unwrap()
        .to_luma8();
    assert_eq!(label, session.rasterize_mask());
    assert_eq!(*label.get_pixel(10, 10), Luma([255]));
    assert_eq!(*label.get_pixel(45, 30), Luma([0]));
}

#[test]
fn uploaded_archive_starts_a_session() {
    let mut png = Cursor::new(Vec::new());
    RgbaImage::from_pixel(30, 20, Rgba([9, 9, 9, 255]))
        .write_to(&mut png, ImageFormat::Png)
        .unwrap();
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    writer
        .start_file("scans/page.png", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(png.get_ref()).unwrap();
    let data = writer.finish().unwrap().into_inner();

    let image = archive::extract_image(&data).unwrap();
    assert_eq!(image.name, "scans/page.png");

    let mut list = DisplayList::new();
    let session = CanvasSession::new(
        image,
        Dims::new(15.0, 10.0),
        Renderer::default(),
        10.0,
        &mut list,
    );
    assert_eq!(session.image_dims(), Dims::new(30.0, 20.0));
    assert!(session.store().is_empty());
}
