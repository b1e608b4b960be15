//! Hardware Resource Management
//!
//! Assigns the RP2350 pins and peripherals to the tasks that own them. None of
//! these are shared between tasks; the only shared object in the system is the
//! drive command store.
//!
//! # Resource Groups
//! - Distance Sensor: HC-SR04 ultrasonic sensor pins
//! - Light Sensor: analog reflectance sensor facing the ring floor
//! - Motor Driver: TB6612FNG pins and PWM slices
//! - Warm-up: RGB indicator LED and piezo buzzer

use assign_resources::assign_resources;
use embassy_rp::adc::InterruptHandler as AdcInterruptHandler;
use embassy_rp::bind_interrupts;
use embassy_rp::peripherals;

assign_resources! {
    /// HC-SR04 ultrasonic distance sensor pins
    distance_sensor: DistanceSensorResources {
        trigger_pin: PIN_15,
        echo_pin: PIN_14,
    },
    /// Reflectance sensor on ADC0, pointing at the floor
    light_sensor: LightSensorResources {
        adc: ADC,
        light_pin: PIN_26,
    },
    /// TB6612FNG dual motor driver pins and PWM channels
    motor_driver: MotorDriverResources {
        standby_pin: PIN_22,
        // Motor drive PWM
        left_slice: PWM_SLICE6,
        left_pwm_pin: PIN_28,
        left_forward_pin: PIN_21,
        left_backward_pin: PIN_20,
        // Motor drive PWM
        right_slice: PWM_SLICE5,
        right_pwm_pin: PIN_27,
        right_forward_pin: PIN_19,
        right_backward_pin: PIN_18,
    },
    /// RGB status LED and buzzer used during warm-up
    warm_up: WarmUpResources {
        pwm_red: PWM_SLICE1,
        red_pin: PIN_2,
        pwm_green: PWM_SLICE2,
        green_pin: PIN_4,
        pwm_blue: PWM_SLICE3,
        blue_pin: PIN_6,
        pwm_buzzer: PWM_SLICE0,
        buzzer_pin: PIN_0,
    },
}

bind_interrupts!(pub struct Irqs {
    ADC_IRQ_FIFO => AdcInterruptHandler;
});
