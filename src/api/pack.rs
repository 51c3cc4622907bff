//! Compact binary packing of a (series, markers) pair.
//!
//! One CBOR array: name, then two sections of parallel index/value
//! arrays. Timestamps travel as their canonical text form, values as
//! null/f64/text, markers as bools.

use std::convert::Infallible;

use minicbor::data::Type;
use minicbor::{Decoder, Encoder};
use thiserror::Error;

use crate::core::{CoreError, Mask, Scalar, TimeSeries, Timestamp};

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum PackError {
    #[error("packed payload is malformed: {0}")]
    Decode(#[from] minicbor::decode::Error),

    #[error(transparent)]
    Encode(#[from] minicbor::encode::Error<Infallible>),

    #[error(transparent)]
    Series(#[from] CoreError),
}

pub fn pack_pair(name: &str, series: &TimeSeries, markers: &Mask) -> Result<Vec<u8>, PackError> {
    let mut buf = Vec::new();
    let mut e = Encoder::new(&mut buf);
    e.array(3)?;
    e.str(name)?;

    e.array(2)?;
    encode_index(&mut e, series.len() as u64, series.timestamps())?;
    e.array(series.len() as u64)?;
    for (_, value) in series.iter() {
        match value {
            None => e.null()?,
            Some(Scalar::Float(f)) => e.f64(*f)?,
            Some(Scalar::Text(s)) => e.str(s)?,
        };
    }

    e.array(2)?;
    encode_index(&mut e, markers.len() as u64, markers.timestamps())?;
    e.array(markers.len() as u64)?;
    for (_, flag) in markers.iter() {
        e.bool(*flag)?;
    }

    Ok(buf)
}

pub fn unpack_pair(bytes: &[u8]) -> Result<(String, TimeSeries, Mask), PackError> {
    let mut d = Decoder::new(bytes);
    expect_array(&mut d, 3)?;
    let name = d.str()?.to_string();

    expect_array(&mut d, 2)?;
    let series_index = decode_index(&mut d)?;
    let values_len = known_len(&mut d)?;
    if values_len != series_index.len() as u64 {
        return Err(minicbor::decode::Error::message("series index/value length mismatch").into());
    }
    let mut values = Vec::with_capacity(values_len as usize);
    for _ in 0..values_len {
        values.push(decode_value(&mut d)?);
    }
    let series = TimeSeries::from_pairs(series_index.into_iter().zip(values))?;

    expect_array(&mut d, 2)?;
    let marker_index = decode_index(&mut d)?;
    let flags_len = known_len(&mut d)?;
    if flags_len != marker_index.len() as u64 {
        return Err(minicbor::decode::Error::message("marker index/value length mismatch").into());
    }
    let mut flags = Vec::with_capacity(flags_len as usize);
    for _ in 0..flags_len {
        flags.push(d.bool()?);
    }
    let markers = Mask::from_points(marker_index.into_iter().zip(flags))?;

    Ok((name, series, markers))
}

fn encode_index<'a, I>(
    e: &mut Encoder<&mut Vec<u8>>,
    len: u64,
    index: I,
) -> Result<(), minicbor::encode::Error<Infallible>>
where
    I: Iterator<Item = &'a Timestamp>,
{
    e.array(len)?;
    for at in index {
        e.str(&at.to_string())?;
    }
    Ok(())
}

fn decode_index(d: &mut Decoder<'_>) -> Result<Vec<Timestamp>, PackError> {
    let len = known_len(d)?;
    let mut index = Vec::with_capacity(len as usize);
    for _ in 0..len {
        index.push(Timestamp::parse(d.str()?)?);
    }
    Ok(index)
}

fn decode_value(d: &mut Decoder<'_>) -> Result<Option<Scalar>, PackError> {
    match d.datatype()? {
        Type::Null => {
            d.skip()?;
            Ok(None)
        }
        Type::String => Ok(Some(Scalar::Text(d.str()?.to_string()))),
        _ => Ok(Some(Scalar::Float(d.f64()?))),
    }
}

fn expect_array(d: &mut Decoder<'_>, want: u64) -> Result<(), PackError> {
    match d.array()? {
        Some(len) if len == want => Ok(()),
        _ => Err(minicbor::decode::Error::message("unexpected array header").into()),
    }
}

fn known_len(d: &mut Decoder<'_>) -> Result<u64, PackError> {
    d.array()?
        .ok_or_else(|| minicbor::decode::Error::message("indefinite arrays unsupported").into())
}
