use std::sync::{Arc, Mutex};
use std::time::Duration;

use dxfsvg_core::drawing::{Drawing, Entity, EntityKind, Image, Insert};
use dxfsvg_core::geometry::{Point2, Rect, Vector2};
use dxfsvg_engine::errors::{ConvertError, ResolveError};
use dxfsvg_engine::resolver::{DataUriResolver, ImageResolver};
use dxfsvg_engine::transform::ViewTransform;
use dxfsvg_engine::{ConversionRequest, Converter, SvgElement};
use futures::FutureExt;
use futures::future::BoxFuture;

fn viewport() -> Rect {
    Rect::new(0.0, 0.0, 100.0, 100.0)
}

fn image(path: &str, x: f64) -> Image {
    Image {
        location: Point2::new(x, 0.0),
        u_vector: Vector2::new(1.0, 0.0),
        v_vector: Vector2::new(0.0, 1.0),
        image_size: Vector2::new(10.0, 10.0),
        file_path: path.to_string(),
    }
}

fn layer_groups(svg: &SvgElement) -> Vec<&SvgElement> {
    svg.find_all("g")
        .into_iter()
        .filter(|group| group.get_attr("class").is_some())
        .collect()
}

fn hrefs(svg: &SvgElement) -> Vec<&str> {
    svg.find_all("image")
        .into_iter()
        .filter_map(|image| image.get_attr("href"))
        .collect()
}

/// 按路径中的数字延迟返回，后出现的图像先完成。
struct DelayedResolver {
    completed: Arc<Mutex<Vec<String>>>,
}

impl ImageResolver for DelayedResolver {
    fn resolve<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String, ResolveError>> {
        async move {
            let delay: u64 = path
                .trim_start_matches("img")
                .trim_end_matches(".png")
                .parse()
                .unwrap_or(0);
            tokio::time::sleep(Duration::from_millis(delay)).await;
            self.completed.lock().unwrap().push(path.to_string());
            Ok(format!("resolved/{path}"))
        }
        .boxed()
    }
}

struct FailingResolver;

impl ImageResolver for FailingResolver {
    fn resolve<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String, ResolveError>> {
        futures::future::ready(Err(ResolveError::NotFound(path.to_string()))).boxed()
    }
}

#[tokio::test]
async fn full_circle_maps_to_viewport_center() {
    let mut drawing = Drawing::new();
    drawing.add_circle(Point2::new(0.0, 0.0), 5.0, "0");
    let drawing_rect = Rect::new(-5.0, -5.0, 10.0, 10.0);

    let svg = Converter::new()
        .convert(&ConversionRequest::new(&drawing, drawing_rect, viewport()))
        .await
        .expect("conversion");

    assert_eq!(svg.tag(), "svg");
    assert_eq!(svg.get_attr("xmlns"), Some("http://www.w3.org/2000/svg"));
    assert_eq!(svg.get_attr("version"), Some("1.1"));
    assert_eq!(svg.get_attr("width"), Some("100.0"));
    assert_eq!(svg.get_attr("viewBox"), Some("0.0 0.0 100.0 100.0"));

    let circles = svg.find_all("circle");
    assert_eq!(circles.len(), 1);
    assert_eq!(circles[0].get_attr("r"), Some("5.0"));
    assert_eq!(circles[0].get_attr("cx"), Some("0.0"));

    let transform = ViewTransform::fit(drawing_rect, viewport());
    assert_eq!(transform.apply(Point2::new(0.0, 0.0)), Point2::new(50.0, 50.0));
    assert_eq!(svg.find_all("path").len(), 0);
}

#[tokio::test]
async fn wide_drawing_is_scaled_by_half() {
    let mut drawing = Drawing::new();
    drawing.add_line(Point2::new(0.0, 0.0), Point2::new(200.0, 100.0), "0");

    let svg = Converter::new()
        .convert(&ConversionRequest::new(
            &drawing,
            Rect::new(0.0, 0.0, 200.0, 100.0),
            viewport(),
        ))
        .await
        .expect("conversion");

    let transforms: Vec<&str> = svg
        .find_all("g")
        .into_iter()
        .filter_map(|group| group.get_attr("transform"))
        .collect();
    assert_eq!(
        transforms[..4].to_vec(),
        vec![
            "translate(0.0 100.0) scale(1.0 -1.0)",
            "translate(0.0 0.0)",
            "scale(0.5 0.5)",
            "translate(0.0 0.0)",
        ]
    );
}

#[tokio::test]
async fn layers_are_emitted_in_name_order() {
    let mut drawing = Drawing::default();
    drawing.add_line(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), "B");
    drawing.add_line(Point2::new(0.0, 0.0), Point2::new(2.0, 2.0), "A");
    drawing.add_image(image("a.png", 0.0), "B");
    drawing.add_image(image("b.png", 0.0), "A");

    let svg = Converter::new()
        .convert(&ConversionRequest::new(
            &drawing,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            viewport(),
        ))
        .await
        .expect("conversion");

    let classes: Vec<&str> = layer_groups(&svg)
        .into_iter()
        .filter_map(|group| group.get_attr("class"))
        .collect();
    assert_eq!(classes, vec!["A", "B", "A", "B"]);
}

#[tokio::test]
async fn image_group_precedes_line_group_and_empty_layers_keep_main_group() {
    let mut drawing = Drawing::new();
    drawing.add_line(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), "L");
    drawing.add_image(image("scan.png", 0.0), "L");

    let svg = Converter::new()
        .convert(&ConversionRequest::new(
            &drawing,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            viewport(),
        ))
        .await
        .expect("conversion");

    let groups = layer_groups(&svg);
    let summary: Vec<(&str, &str)> = groups
        .iter()
        .map(|group| {
            (
                group.get_attr("class").unwrap_or_default(),
                group.children().first().map(SvgElement::tag).unwrap_or(""),
            )
        })
        .collect();
    // 图层 "0" 没有图像，只出现主分组，且为空。
    assert_eq!(summary, vec![("L", "image"), ("0", ""), ("L", "line")]);

    let image = svg.find_all("image")[0];
    assert_eq!(image.get_attr("href"), Some("scan.png"));
    assert_eq!(image.get_attr("width"), Some("10.0"));
    assert_eq!(image.get_attr("preserveAspectRatio"), Some("none"));
    assert_eq!(
        image.get_attr("transform"),
        Some("translate(0.0 10.0) rotate(0.0) scale(1.0 -1.0)")
    );
}

#[tokio::test]
async fn failed_image_resolution_aborts_conversion() {
    let mut drawing = Drawing::new();
    drawing.add_line(Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), "0");
    drawing.add_image(image("missing.png", 0.0), "0");

    let result = Converter::new()
        .with_resolver(FailingResolver)
        .convert(&ConversionRequest::new(
            &drawing,
            Rect::new(0.0, 0.0, 10.0, 10.0),
            viewport(),
        ))
        .await;

    match result {
        Err(ConvertError::ImageResolution { path, source }) => {
            assert_eq!(path, "missing.png");
            assert!(matches!(source, ResolveError::NotFound(_)));
        }
        other => panic!("expected resolution failure, got {other:?}"),
    }
}

#[tokio::test]
async fn output_follows_document_order_not_completion_order() {
    let mut drawing = Drawing::new();
    drawing.add_image(image("img60.png", 0.0), "0");
    drawing.add_image(image("img30.png", 10.0), "0");
    drawing.add_image(image("img5.png", 20.0), "0");

    let completed = Arc::new(Mutex::new(Vec::new()));
    let resolver = DelayedResolver {
        completed: Arc::clone(&completed),
    };
    let converter = Converter::new().with_resolver(resolver);
    let svg = converter
        .convert(&ConversionRequest::new(
            &drawing,
            Rect::new(0.0, 0.0, 30.0, 10.0),
            viewport(),
        ))
        .await
        .expect("conversion");

    assert_eq!(
        hrefs(&svg),
        vec!["resolved/img60.png", "resolved/img30.png", "resolved/img5.png"]
    );
    assert_eq!(
        *completed.lock().unwrap(),
        vec!["img5.png", "img30.png", "img60.png"]
    );
}

#[tokio::test]
async fn images_inside_inserts_are_resolved_with_top_level_images() {
    let mut drawing = Drawing::new();
    let nested = Entity::new("0", EntityKind::Image(image("img40.png", 0.0)));
    drawing.add_insert(Insert::new("FRAME", Point2::new(5.0, 0.0), vec![nested]), "0");
    drawing.add_image(image("img1.png", 10.0), "0");

    let completed = Arc::new(Mutex::new(Vec::new()));
    let resolver = DelayedResolver {
        completed: Arc::clone(&completed),
    };
    let svg = Converter::new()
        .with_resolver(resolver)
        .convert(&ConversionRequest::new(
            &drawing,
            Rect::new(0.0, 0.0, 30.0, 10.0),
            viewport(),
        ))
        .await
        .expect("conversion");

    // 顶层图像在图像分组中先输出，块内图像随块参照留在主分组。
    assert_eq!(hrefs(&svg), vec!["resolved/img1.png", "resolved/img40.png"]);
    assert_eq!(*completed.lock().unwrap(), vec!["img1.png", "img40.png"]);

    let block = svg
        .find_all("g")
        .into_iter()
        .find(|group| group.get_attr("data-block") == Some("FRAME"))
        .expect("insert group");
    assert_eq!(block.children().len(), 1);
    assert_eq!(block.children()[0].tag(), "image");
    assert_eq!(block.children()[0].get_attr("href"), Some("resolved/img40.png"));
}

#[tokio::test]
async fn identifier_hands_parameters_to_template() {
    let mut drawing = Drawing::new();
    drawing.add_line(Point2::new(0.0, 0.0), Point2::new(200.0, 100.0), "walls");

    let svg = Converter::new()
        .convert(
            &ConversionRequest::new(&drawing, Rect::new(0.0, 0.0, 200.0, 100.0), viewport())
                .with_identifier("plan"),
        )
        .await
        .expect("conversion");

    assert_eq!(svg.tag(), "div");
    assert_eq!(svg.get_attr("id"), Some("plan"));
    assert_eq!(svg.get_attr("data-layers"), Some("0,walls"));
    assert_eq!(svg.get_attr("data-pan-x"), Some("0.0"));
    assert_eq!(svg.get_attr("data-scale-x"), Some("0.5"));
    assert_eq!(svg.get_attr("data-scale-y"), Some("0.5"));
    assert_eq!(svg.children()[0].tag(), "svg");
}

#[tokio::test]
async fn centered_drawing_shifts_pan() {
    let mut drawing = Drawing::new();
    drawing.add_line(Point2::new(0.0, 0.0), Point2::new(200.0, 100.0), "0");

    let svg = Converter::new()
        .center_drawing(true)
        .convert(
            &ConversionRequest::new(&drawing, Rect::new(0.0, 0.0, 200.0, 100.0), viewport())
                .with_identifier("plan"),
        )
        .await
        .expect("conversion");

    assert_eq!(svg.get_attr("data-pan-y"), Some("25.0"));
}

#[tokio::test]
async fn data_uri_resolver_embeds_image_bytes() {
    let mut drawing = Drawing::new();
    drawing.add_image(image("photo.JPEG", 0.0), "0");
    drawing.add_image(image("raw.bin", 10.0), "0");

    let resolver = DataUriResolver::new(|_path: String| async { Ok::<_, ResolveError>(b"hi".to_vec()) });
    let svg = Converter::new()
        .with_resolver(resolver)
        .convert(&ConversionRequest::new(
            &drawing,
            Rect::new(0.0, 0.0, 20.0, 10.0),
            viewport(),
        ))
        .await
        .expect("conversion");

    assert_eq!(
        hrefs(&svg),
        vec!["data:image/jpeg;base64,aGk=", "data:image/unknown;base64,aGk="]
    );
}
