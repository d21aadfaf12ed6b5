//! The `statistics` module: averages and measures of spread.

use crate::interp::error::{ErrorKind, EvalError, EvalResult};
use crate::interp::methods::sort_values;
use crate::interp::native::{Args, ModuleSpec, NativeFunction, Runtime};
use crate::interp::value::{values_equal, Value};

pub static STATISTICS: ModuleSpec = ModuleSpec {
    name: "statistics",
    functions: STATISTICS_FUNCTIONS,
    constants: &[],
};

static STATISTICS_FUNCTIONS: &[NativeFunction] = &[
    entry!(
        "mean",
        "data",
        "Return the sample arithmetic mean of data.\n\nIf data is empty, StatisticsError will be raised.",
        mean
    ),
    entry!(
        "fmean",
        "data",
        "Convert data to floats and compute the arithmetic mean.\n\nThis runs faster than the mean() function and it always returns a float.",
        fmean
    ),
    entry!(
        "median",
        "data",
        "Return the median (middle value) of numeric data.\n\nWhen the number of data points is even, the median is interpolated by taking the average of the two middle values.",
        median
    ),
    entry!(
        "median_low",
        "data",
        "Return the low median of numeric data.\n\nWhen the number of data points is even, the smaller of the two middle values is returned.",
        median_low
    ),
    entry!(
        "median_high",
        "data",
        "Return the high median of data.\n\nWhen the number of data points is even, the larger of the two middle values is returned.",
        median_high
    ),
    entry!(
        "mode",
        "data",
        "Return the most common data point from discrete or nominal data.",
        mode
    ),
    entry!(
        "variance",
        "data, xbar=None",
        "Return the sample variance of data.\n\ndata should be an iterable of Real-valued numbers, with at least two values.",
        variance
    ),
    entry!(
        "pvariance",
        "data, mu=None",
        "Return the population variance of ``data``.\n\ndata should be a sequence or iterable of Real-valued numbers, with at least one value.",
        pvariance
    ),
    entry!(
        "stdev",
        "data, xbar=None",
        "Return the square root of the sample variance.",
        stdev
    ),
    entry!(
        "pstdev",
        "data, mu=None",
        "Return the square root of the population variance.",
        pstdev
    ),
    entry!(
        "harmonic_mean",
        "data",
        "Return the harmonic mean of data.\n\nThe harmonic mean is the reciprocal of the arithmetic mean of the reciprocals of the data.",
        harmonic_mean
    ),
    entry!(
        "geometric_mean",
        "data",
        "Convert data to floats and compute the geometric mean.\n\nRaises a StatisticsError if the input dataset is empty, if it contains a zero, or if it contains a negative value.",
        geometric_mean
    ),
];

fn statistics_error(message: impl Into<String>) -> EvalError {
    EvalError::new(ErrorKind::Statistics, message)
}

/// Numeric data, kept exact while every point is an integer.
enum Data {
    Ints(Vec<i64>),
    Floats(Vec<f64>),
}

impl Data {
    fn len(&self) -> usize {
        match self {
            Data::Ints(v) => v.len(),
            Data::Floats(v) => v.len(),
        }
    }

    fn floats(&self) -> Vec<f64> {
        match self {
            Data::Ints(v) => v.iter().map(|&i| i as f64).collect(),
            Data::Floats(v) => v.clone(),
        }
    }
}

fn numeric_data(rt: &mut Runtime, args: &Args, name: &str) -> EvalResult<Data> {
    args.expect(name, 1, 2)?;
    let items = rt.collect(&args.arg(0))?;
    if let Some(ints) = items.iter().map(Value::as_int).collect::<Option<Vec<_>>>() {
        return Ok(Data::Ints(ints));
    }
    let floats = items
        .iter()
        .map(|v| {
            v.as_f64().ok_or_else(|| {
                EvalError::type_error(format!(
                    "can't convert type '{}' to numerator/denominator",
                    v.type_name()
                ))
            })
        })
        .collect::<EvalResult<Vec<_>>>()?;
    Ok(Data::Floats(floats))
}

/// An exact ratio collapses to an int; anything else becomes a float.
fn ratio(numerator: i128, denominator: i128) -> Value {
    if numerator % denominator == 0 {
        let quotient = numerator / denominator;
        if let Ok(i) = i64::try_from(quotient) {
            return Value::Int(i);
        }
    }
    Value::Float(numerator as f64 / denominator as f64)
}

fn float_mean(values: &[f64]) -> f64 {
    let mut sum = 0.0;
    let mut compensation = 0.0;
    for &x in values {
        let t = sum + x;
        if f64::abs(sum) >= x.abs() {
            compensation += (sum - t) + x;
        } else {
            compensation += (x - t) + sum;
        }
        sum = t;
    }
    (sum + compensation) / values.len() as f64
}

fn mean(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let data = numeric_data(rt, &args, "mean")?;
    if data.len() == 0 {
        return Err(statistics_error("mean requires at least one data point"));
    }
    Ok(match data {
        Data::Ints(v) => ratio(v.iter().map(|&i| i as i128).sum(), v.len() as i128),
        Data::Floats(v) => Value::Float(float_mean(&v)),
    })
}

fn fmean(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let data = numeric_data(rt, &args, "fmean")?;
    if data.len() == 0 {
        return Err(statistics_error("fmean requires at least one data point"));
    }
    Ok(Value::Float(float_mean(&data.floats())))
}

fn sorted_points(rt: &mut Runtime, args: &Args, name: &str) -> EvalResult<Vec<Value>> {
    args.expect(name, 1, 1)?;
    let mut items = rt.collect(&args.arg(0))?;
    if items.is_empty() {
        return Err(statistics_error("no median for empty data"));
    }
    sort_values(&mut items)?;
    Ok(items)
}

fn median(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let items = sorted_points(rt, &args, "median")?;
    let n = items.len();
    if n % 2 == 1 {
        return Ok(items[n / 2].clone());
    }
    let low = items[n / 2 - 1].expect_f64("median()")?;
    let high = items[n / 2].expect_f64("median()")?;
    Ok(Value::Float((low + high) / 2.0))
}

fn median_low(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let items = sorted_points(rt, &args, "median_low")?;
    let n = items.len();
    let index = if n % 2 == 1 { n / 2 } else { n / 2 - 1 };
    Ok(items[index].clone())
}

fn median_high(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let items = sorted_points(rt, &args, "median_high")?;
    Ok(items[items.len() / 2].clone())
}

fn mode(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    args.expect("mode", 1, 1)?;
    let items = rt.collect(&args.arg(0))?;
    let mut counts: Vec<(Value, usize)> = Vec::new();
    for item in items {
        rt.tick()?;
        match counts.iter_mut().find(|(v, _)| values_equal(v, &item)) {
            Some((_, count)) => *count += 1,
            None => counts.push((item, 1)),
        }
    }
    let best = counts.iter().map(|(_, c)| *c).max();
    counts
        .into_iter()
        .find(|(_, c)| Some(*c) == best)
        .map(|(v, _)| v)
        .ok_or_else(|| statistics_error("no mode for empty data"))
}

/// Sum of squared deviations, exact for integer data.
fn squared_deviations(data: &Data) -> Deviations {
    match data {
        Data::Ints(v) => {
            let n = v.len() as i128;
            let sum: i128 = v.iter().map(|&i| i as i128).sum();
            let sum_sq: i128 = v.iter().map(|&i| (i as i128) * (i as i128)).sum();
            // n * SS = n * sum(x^2) - sum(x)^2
            Deviations::Exact(n * sum_sq - sum * sum)
        }
        Data::Floats(v) => {
            let m = float_mean(v);
            Deviations::Float(v.iter().map(|x| (x - m) * (x - m)).sum())
        }
    }
}

enum Deviations {
    /// `n` times the sum of squared deviations.
    Exact(i128),
    Float(f64),
}

fn spread(rt: &mut Runtime, args: &Args, name: &str, sample: bool) -> EvalResult<Value> {
    let data = numeric_data(rt, args, name)?;
    let n = data.len();
    if sample && n < 2 {
        return Err(statistics_error(
            "variance requires at least two data points",
        ));
    }
    if n < 1 {
        return Err(statistics_error(
            "pvariance requires at least one data point",
        ));
    }
    let dof = if sample { n - 1 } else { n };
    Ok(match squared_deviations(&data) {
        Deviations::Exact(scaled) => ratio(scaled, n as i128 * dof as i128),
        Deviations::Float(ss) => Value::Float(ss / dof as f64),
    })
}

fn variance(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    spread(rt, &args, "variance", true)
}

fn pvariance(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    spread(rt, &args, "pvariance", false)
}

fn stdev(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let var = spread(rt, &args, "stdev", true)?;
    Ok(Value::Float(var.expect_f64("stdev()")?.sqrt()))
}

fn pstdev(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let var = spread(rt, &args, "pstdev", false)?;
    Ok(Value::Float(var.expect_f64("pstdev()")?.sqrt()))
}

fn harmonic_mean(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let values = numeric_data(rt, &args, "harmonic_mean")?.floats();
    if values.is_empty() {
        return Err(statistics_error(
            "harmonic_mean requires at least one data point",
        ));
    }
    if values.iter().any(|&x| x < 0.0) {
        return Err(statistics_error(
            "harmonic mean does not support negative values",
        ));
    }
    if values.iter().any(|&x| x == 0.0) {
        return Ok(Value::Float(0.0));
    }
    let reciprocal_sum: f64 = values.iter().map(|x| 1.0 / x).sum();
    Ok(Value::Float(values.len() as f64 / reciprocal_sum))
}

fn geometric_mean(rt: &mut Runtime, args: Args) -> EvalResult<Value> {
    let values = numeric_data(rt, &args, "geometric_mean")?.floats();
    if values.is_empty() || values.iter().any(|&x| x <= 0.0) {
        return Err(statistics_error(
            "geometric mean requires a non-empty dataset containing positive numbers",
        ));
    }
    let log_mean = values.iter().map(|x| x.ln()).sum::<f64>() / values.len() as f64;
    Ok(Value::Float(log_mean.exp()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sandbox::config::SandboxConfig;
    use crate::sandbox::limits::{Interrupt, StepLimiter};

    fn call(name: &str, data: Vec<Value>) -> EvalResult<Value> {
        let mut rt = Runtime::new(StepLimiter::new(&SandboxConfig::default(), Interrupt::new()));
        STATISTICS
            .function(name)
            .unwrap()
            .invoke(&mut rt, Args::new(vec![Value::list(data)]))
    }

    fn ints(values: &[i64]) -> Vec<Value> {
        values.iter().map(|&i| Value::Int(i)).collect()
    }

    #[test]
    fn test_mean_keeps_exact_ints() {
        assert!(matches!(call("mean", ints(&[1, 2, 3])), Ok(Value::Int(2))));
        assert!(matches!(call("mean", ints(&[1, 2, 3, 4])), Ok(Value::Float(f)) if f == 2.5));
        let err = call("mean", Vec::new()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Statistics);
    }

    #[test]
    fn test_median_variants() {
        assert!(matches!(call("median", ints(&[3, 1, 2])), Ok(Value::Int(2))));
        assert!(matches!(call("median", ints(&[1, 2, 3, 4])), Ok(Value::Float(f)) if f == 2.5));
        assert!(matches!(call("median_low", ints(&[1, 2, 3, 4])), Ok(Value::Int(2))));
        assert!(matches!(call("median_high", ints(&[1, 2, 3, 4])), Ok(Value::Int(3))));
    }

    #[test]
    fn test_variance_and_stdev() {
        assert!(matches!(call("variance", ints(&[1, 2, 3])), Ok(Value::Int(1))));
        assert!(matches!(call("pstdev", ints(&[2, 4, 4, 4, 5, 5, 7, 9])), Ok(Value::Float(f)) if f == 2.0));
        assert!(call("variance", ints(&[1])).is_err());
    }

    #[test]
    fn test_mode_prefers_first_seen() {
        assert!(matches!(call("mode", ints(&[1, 2, 2, 3, 3])), Ok(Value::Int(2))));
    }
}
