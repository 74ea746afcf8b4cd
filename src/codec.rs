use crate::error::*;
use crate::image::Raster;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;

/// Boundary between the pipeline and whatever stores or displays images.
///
/// The pipeline itself only ever sees [`Raster`]s.
pub trait Codec {
    /// Fully decoded RGBA pixels, or `DecodeFailed`
    fn decode_image(&self, bytes: &[u8]) -> Result<Raster, Error>;

    fn encode_raster(&self, raster: &Raster) -> Result<Vec<u8>, Error>;

    /// For `data:` URLs
    fn mime_type(&self) -> &'static str;
}

/// Lossless PNG via lodepng
#[derive(Debug, Default, Clone, Copy)]
pub struct PngCodec;

impl Codec for PngCodec {
    fn decode_image(&self, bytes: &[u8]) -> Result<Raster, Error> {
        let bitmap = lodepng::decode32(bytes).map_err(|_| DecodeFailed)?;
        Raster::new(bitmap.buffer, bitmap.width, bitmap.height)
    }

    fn encode_raster(&self, raster: &Raster) -> Result<Vec<u8>, Error> {
        lodepng::encode32(raster.pixels(), raster.width(), raster.height()).map_err(|_| EncodeFailed)
    }

    fn mime_type(&self) -> &'static str {
        "image/png"
    }
}

/// Anything the `image` crate can read: PNG, JPEG, GIF (first frame).
///
/// Output is always PNG, so previews stay lossless.
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageCodec;

impl Codec for ImageCodec {
    fn decode_image(&self, bytes: &[u8]) -> Result<Raster, Error> {
        let img = image::load_from_memory(bytes).map_err(|_| DecodeFailed)?.to_rgba8();
        let (width, height) = (img.width() as usize, img.height() as usize);
        Raster::from_rgba_bytes(img.as_raw(), width, height)
    }

    fn encode_raster(&self, raster: &Raster) -> Result<Vec<u8>, Error> {
        PngCodec.encode_raster(raster)
    }

    fn mime_type(&self) -> &'static str {
        PngCodec.mime_type()
    }
}

/// `data:<mime>;base64,<encoded raster>`, the form the page overlay loads images from
pub fn data_url(codec: &dyn Codec, raster: &Raster) -> Result<String, Error> {
    let bytes = codec.encode_raster(raster)?;
    let mime = codec.mime_type();
    let mut url = String::new();
    url.try_reserve_exact(5 + mime.len() + 8 + (bytes.len() + 2) / 3 * 4)?;
    url.push_str("data:");
    url.push_str(mime);
    url.push_str(";base64,");
    STANDARD.encode_string(&bytes, &mut url);
    Ok(url)
}

/// Inverse of [`data_url`]. The MIME type isn't checked; the codec decides whether it can read the payload.
pub fn decode_data_url(codec: &dyn Codec, url: &str) -> Result<Raster, Error> {
    let payload = url.strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .map(|(_, payload)| payload)
        .ok_or(DecodeFailed)?;
    let bytes = STANDARD.decode(payload.trim()).map_err(|_| DecodeFailed)?;
    codec.decode_image(&bytes)
}

#[test]
fn png_round_trip() {
    use crate::pal::RGBA;
    let px = vec![RGBA::new(1, 2, 3, 255), RGBA::new(0, 0, 0, 0), RGBA::new(250, 128, 114, 255)];
    let r = Raster::new(px, 3, 1).unwrap();
    let url = data_url(&PngCodec, &r).unwrap();
    assert!(url.starts_with("data:image/png;base64,iVBOR"));
    let back = decode_data_url(&PngCodec, &url).unwrap();
    assert_eq!((3, 1), back.size());
    assert_eq!(r.pixels()[0], back.pixels()[0]);
    assert_eq!(0, back.pixels()[1].a);
    assert_eq!(r.pixels()[2], back.pixels()[2]);
}

#[test]
fn png_encoder_writes_signature() {
    use crate::pal::RGBA;
    let r = Raster::new(vec![RGBA::new(9, 8, 7, 255); 6], 2, 3).unwrap();
    let bytes = PngCodec.encode_raster(&r).unwrap();
    assert_eq!(b"\x89PNG\r\n\x1a\n", &bytes[..8]);
    assert_eq!(r, PngCodec.decode_image(&bytes).unwrap());
}

#[cfg(test)]
fn encoded_as(img: image::DynamicImage, format: image::ImageFormat) -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    img.write_to(&mut out, format).unwrap();
    out.into_inner()
}

#[test]
fn any_format_decodes_to_rgba() {
    let jpeg = encoded_as(image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(5, 3, image::Rgb([40, 120, 200]))), image::ImageFormat::Jpeg);
    assert_eq!(Err(DecodeFailed), PngCodec.decode_image(&jpeg).map(|_| ()));
    let r = ImageCodec.decode_image(&jpeg).unwrap();
    assert_eq!((5, 3), r.size());
    assert!(r.pixels().iter().all(|px| px.a == 255 && px.b > px.r));

    let gif = encoded_as(image::DynamicImage::ImageRgba8(image::RgbaImage::from_pixel(4, 2, image::Rgba([255, 0, 0, 255]))), image::ImageFormat::Gif);
    assert_eq!(Err(DecodeFailed), PngCodec.decode_image(&gif).map(|_| ()));
    let r = ImageCodec.decode_image(&gif).unwrap();
    assert_eq!((4, 2), r.size());
    assert_eq!(8, r.opaque_count());

    let png = PngCodec.encode_raster(&r).unwrap();
    assert_eq!(r, ImageCodec.decode_image(&png).unwrap());
    let url = data_url(&ImageCodec, &r).unwrap();
    assert!(url.starts_with("data:image/png;base64,"));
    assert_eq!(Err(DecodeFailed), ImageCodec.decode_image(b"not an image").map(|_| ()));
}

#[test]
fn garbage_is_decode_failed() {
    assert_eq!(Err(DecodeFailed), PngCodec.decode_image(b"GIF89a").map(|_| ()));
    assert_eq!(Err(DecodeFailed), decode_data_url(&PngCodec, "not a url").map(|_| ()));
    assert_eq!(Err(DecodeFailed), decode_data_url(&PngCodec, "data:image/png;base64,@@@").map(|_| ()));
}
