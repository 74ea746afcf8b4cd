use pixelguide::*;

fn png(pixels: &[RGBA], width: usize, height: usize) -> Vec<u8> {
    lodepng::encode32(pixels, width, height).unwrap()
}

fn bw() -> Palette {
    Palette::from_colors(&[RGB::new(0, 0, 0), RGB::new(255, 255, 255)]).unwrap()
}

fn gradient(width: usize, height: usize) -> Raster {
    let px: Vec<_> = (0..width * height).map(|i| {
        let (x, y) = (i % width, i / width);
        let a = if (x * 7 + y * 3) % 11 == 0 { 0 } else { 255 };
        RGBA::new((x * 255 / width) as u8, (y * 255 / height) as u8, ((x + y) * 3) as u8, a)
    }).collect();
    Raster::new(px, width, height).unwrap()
}

#[test]
fn two_by_two_from_png() {
    let src = [
        RGBA::new(255, 0, 0, 255), RGBA::new(0, 255, 0, 255),
        RGBA::new(0, 0, 255, 0), RGBA::new(10, 10, 10, 255),
    ];
    let mut attr = new();
    attr.set_scale_percent(100.).unwrap();
    let img = attr.decode_image(&PngCodec, &png(&src, 2, 2)).unwrap();
    let conv = attr.convert(&img, &bw()).unwrap();

    assert_eq!((2, 2), conv.scaled_size());
    let q = conv.quantized().pixels();
    assert_eq!(RGBA::new(0, 0, 0, 255), q[0]);
    assert_eq!(RGBA::new(0, 0, 0, 255), q[1]);
    assert_eq!(0, q[2].a);
    assert_eq!(RGBA::new(0, 0, 0, 255), q[3]);

    let counts = conv.color_counts();
    assert_eq!(1, counts.len());
    assert_eq!(3, counts.get_by_key("0,0,0"));
    assert_eq!(Some(&3), counts.to_keyed_map().get("0,0,0"));
}

#[test]
fn deterministic() {
    let img = gradient(123, 77);
    let mut attr = new();
    attr.set_scale_percent(17.).unwrap();
    let pal = PaletteState::new().selected_palette();
    let a = attr.convert(&img, &pal).unwrap();
    let b = attr.convert(&img, &pal).unwrap();
    assert_eq!(a.quantized(), b.quantized());
    assert_eq!(a.color_counts(), b.color_counts());
    assert_eq!(a.render_blocks(None).unwrap(), b.render_blocks(None).unwrap());

    let (q, counts) = quantize(&downscale(&img, 17.).unwrap(), &pal).unwrap();
    assert_eq!(a.quantized(), &q);
    assert_eq!(a.color_counts(), &counts);
}

#[test]
fn alpha_survives_every_stage() {
    let img = gradient(40, 40);
    let mut attr = new();
    attr.set_scale_percent(100.).unwrap();
    let conv = attr.convert(&img, &bw()).unwrap();
    let up = conv.upscaled().unwrap();
    let blocks = conv.render_blocks(None).unwrap();
    assert_eq!(1, conv.block_size());

    for ((src, q), u) in img.pixels().iter().zip(conv.quantized().pixels()).zip(up.pixels()) {
        assert_eq!(src.a, q.a);
        assert_eq!(src.a, u.a);
    }
    for (src, b) in img.pixels().iter().zip(blocks.pixels()) {
        if src.a == 0 {
            assert_eq!(0, b.a);
        }
    }
    assert_eq!(img.opaque_count() as u64, conv.color_counts().total());
    assert_eq!(img.opaque_count(), conv.placed_pixels().len());
}

#[test]
fn downscale_floor() {
    let one = Raster::new(vec![RGBA::new(1, 2, 3, 255)], 1, 1).unwrap();
    for p in [0.0001, 1., 50., 100.] {
        assert_eq!((1, 1), downscale(&one, p).unwrap().size());
    }
    let img = gradient(300, 7);
    assert_eq!((1, 1), downscale(&img, 0.01).unwrap().size());
    assert_eq!((24, 1), downscale(&img, 8.).unwrap().size());
    assert!(downscale(&img, 0.).is_err());
}

#[test]
fn filter_isolates_one_color() {
    let red = RGB::new(237, 28, 36);
    let blue = RGB::new(64, 147, 228);
    let px: Vec<_> = (0..100 * 50).map(|i| {
        let c = if (i % 100) / 10 % 2 == 0 { red } else { blue };
        RGBA::new(c.r, c.g, c.b, 255)
    }).collect();
    let img = Raster::new(px, 100, 50).unwrap();

    let mut attr = new();
    attr.set_scale_percent(10.).unwrap();
    let conv = attr.convert(&img, &Palette::from_colors(&[red, blue]).unwrap()).unwrap();
    assert_eq!((10, 5), conv.scaled_size());
    assert_eq!(10, conv.block_size());

    let style = attr.block_style();
    let filtered = conv.render_blocks(Some(red)).unwrap();
    assert_eq!((100, 50), filtered.size());
    for by in 0..5 {
        for bx in 0..10 {
            let expected = if bx % 2 == 0 { RGBA::new(red.r, red.g, red.b, 255) } else { style.padding };
            assert_eq!(Some(expected), filtered.pixel(bx * 10 + 5, by * 10 + 5), "{bx},{by}");
            assert_eq!(Some(style.border), filtered.pixel(bx * 10, by * 10));
        }
    }
}

#[test]
fn overlay_payload() {
    let img = gradient(64, 32);
    let mut attr = new();
    attr.set_scale_percent(25.).unwrap();
    let conv = attr.convert(&img, &bw()).unwrap();
    let req = conv.overlay_request(&PngCodec).unwrap();
    assert_eq!(PREPARE_OVERLAY_ACTION, req.action);
    assert_eq!(64, req.original_image_width);
    assert_eq!(32, req.original_image_height);
    assert_eq!(25., req.pixel_scale);
    assert_eq!(vec![[0, 0, 0], [255, 255, 255]], req.palette);

    let json = req.to_json().unwrap();
    assert!(json.contains("\"action\":\"prepareForOverlayPlacement\""));
    assert!(json.contains("\"pixelArtDataUrl\":\"data:image/png;base64,"));
    assert!(!json.contains("\"imageDataUrl\""));
    let back = OverlayRequest::from_json(&json).unwrap();
    let grid = decode_data_url(&PngCodec, &back.scaled_image_data_url).unwrap();
    assert_eq!(conv.quantized(), &grid);
    assert!(grid.pixels().iter().filter(|px| px.a != 0).all(|px| [(0, 0, 0), (255, 255, 255)].contains(&(px.r, px.g, px.b))));
    assert_eq!(conv.scaled(), &decode_data_url(&PngCodec, &back.unscaled_image_data_url).unwrap());
    let art = decode_data_url(&PngCodec, &back.pixel_art_data_url).unwrap();
    assert_eq!((64, 32), art.size());
    assert_eq!(conv.upscaled().unwrap(), art);
}

#[test]
fn jpeg_upload() {
    let rgb = image::RgbImage::from_pixel(40, 20, image::Rgb([230, 230, 230]));
    let mut jpeg = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(rgb).write_to(&mut jpeg, image::ImageFormat::Jpeg).unwrap();
    let jpeg = jpeg.into_inner();

    let mut attr = new();
    attr.set_scale_percent(10.).unwrap();
    assert_eq!(Err(Error::DecodeFailed), attr.decode_image(&PngCodec, &jpeg).map(|_| ()));
    let img = attr.decode_image(&ImageCodec, &jpeg).unwrap();
    assert_eq!((40, 20), img.size());
    let conv = attr.convert(&img, &bw()).unwrap();
    assert_eq!((4, 2), conv.scaled_size());
    assert_eq!(8, conv.color_counts().get(RGB::new(255, 255, 255)));
}

#[test]
fn session_flow() {
    let mut session = Session::new(new());
    assert_eq!(Ok(false), session.refresh());

    session.set_image(gradient(50, 50));
    session.set_scale_percent(20.).unwrap();
    let resp = AvailableColorsResponse::from_json(r#"{"availableColors":["rgb(0, 0, 0)","rgb(255, 255, 255)"]}"#).unwrap();
    session.apply_available(resp.available_colors.as_slice());
    assert_eq!(bw(), session.palette().selected_palette());

    let stale = session.request().unwrap();
    session.deselect_all();
    assert!(stale.is_stale());
    assert_eq!(Err(Error::Aborted), stale.run().map(|_| ()));
    assert_eq!(Ok(true), session.refresh());

    let latest = session.latest().unwrap();
    assert_eq!((10, 10), latest.scaled_size());
    let white = session.palette().get("White").unwrap().count();
    assert_eq!(latest.color_counts().total(), u64::from(white));
    assert_eq!(0, session.palette().get("Black").unwrap().count());
}

#[test]
fn bad_png() {
    let attr = new();
    assert_eq!(Err(Error::DecodeFailed), attr.decode_image(&PngCodec, b"not a png").map(|_| ()));
}
