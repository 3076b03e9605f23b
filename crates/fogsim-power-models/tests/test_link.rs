use approx::assert_abs_diff_eq;

use fogsim_power_models::{LinkPowerModel, PerBitPowerModel, PowerMeasurement};

#[test]
fn test_per_bit_power() {
    let model = PerBitPowerModel::new(1e-8);
    assert_eq!(model.get_power(0., 0.).unwrap().total(), 0.);
    assert_abs_diff_eq!(model.get_power(0., 1e9).unwrap().total(), 10., epsilon = 1e-9);
    assert_eq!(model.get_power(0., 1e9).unwrap().static_power, 0.);
    assert!(PerBitPowerModel::new(-1.).validate().is_err());
}

#[test]
fn test_measurement_arithmetic() {
    let a = PowerMeasurement::new(10., 5.);
    let b = PowerMeasurement::dynamic(2.);
    assert_eq!((a + b).total(), 17.);
    assert_eq!((a * 0.5).total(), 7.5);
    let sum: PowerMeasurement = vec![a, b, b].into_iter().sum();
    assert_eq!(sum, PowerMeasurement::new(10., 9.));
}
