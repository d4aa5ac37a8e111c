use image::codecs::png::CompressionType;
use image::{ImageBuffer, ImageFormat, Rgba};
use proptest::prelude::*;

use nexus_icons::icon_factory::ico::{ICO_IMAGE_OFFSET, encode_ico};
use nexus_icons::icon_factory::{IcoContainer, IconError, SizedRaster};

fn raster_from_seed(seed: u32) -> SizedRaster {
    let pixels = ImageBuffer::from_fn(32, 32, |x, y| {
        let v = seed.wrapping_mul(31).wrapping_add(x * 17 + y * 13);
        Rgba([v as u8, (v >> 3) as u8, (v >> 7) as u8, (v >> 11) as u8])
    });
    SizedRaster { size: 32, pixels }
}

fn compression(level: u8) -> CompressionType {
    match level % 3 {
        0 => CompressionType::Fast,
        1 => CompressionType::Default,
        _ => CompressionType::Best,
    }
}

proptest! {
    #[test]
    fn header_invariants_hold_for_any_pixels(seed in any::<u32>(), level in 0u8..3) {
        let source = raster_from_seed(seed);
        let ico = encode_ico(&source, compression(level)).expect("encode");
        let bytes = ico.as_bytes();

        prop_assert_eq!(&bytes[0..6], &[0u8, 0, 1, 0, 1, 0][..]);
        prop_assert_eq!(bytes[6], 32);
        prop_assert_eq!(bytes[7], 32);
        prop_assert_eq!(ico.bits_per_pixel(), 32);
        prop_assert_eq!(ico.image_offset(), ICO_IMAGE_OFFSET);
        prop_assert_eq!(ico.image_len() as usize, bytes.len() - 22);

        let decoded = image::load_from_memory_with_format(ico.embedded_png(), ImageFormat::Png)
            .expect("embedded png")
            .to_rgba8();
        prop_assert_eq!(decoded, source.pixels);
    }
}

#[test]
fn image_crate_reads_our_ico_at_32px() {
    let ico = encode_ico(&raster_from_seed(7), CompressionType::Default).expect("encode");
    let decoded = image::load_from_memory_with_format(ico.as_bytes(), ImageFormat::Ico)
        .expect("ico decode");
    assert_eq!((decoded.width(), decoded.height()), (32, 32));
}

#[test]
fn corrupted_length_field_is_detected() {
    let mut bytes = encode_ico(&raster_from_seed(1), CompressionType::Fast)
        .expect("encode")
        .into_bytes();
    bytes[14] = bytes[14].wrapping_add(1);

    assert!(matches!(IcoContainer::parse(bytes), Err(IconError::Encode(_))));
}

#[test]
fn wrong_resource_type_is_detected() {
    let mut bytes = encode_ico(&raster_from_seed(2), CompressionType::Fast)
        .expect("encode")
        .into_bytes();
    // type = 2 表示光标
    bytes[2] = 2;

    assert!(matches!(IcoContainer::parse(bytes), Err(IconError::Encode(_))));
}
